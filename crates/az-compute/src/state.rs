use crate::types::InstanceState;

/// Provider provisioning-state labels and their neutral meaning. A new
/// provider label is a row here, not new branching logic.
const PROVISIONING_STATES: &[(&str, InstanceState)] = &[
    ("Creating", InstanceState::Pending),
    ("Updating", InstanceState::Pending),
    ("Migrating", InstanceState::Pending),
    ("Deleting", InstanceState::Pending),
    ("Succeeded", InstanceState::Ready),
    ("Failed", InstanceState::Failed),
    ("Canceled", InstanceState::Failed),
];

/// Map a provider-reported provisioning state onto the neutral
/// enumeration. Labels the table does not know map to `Unknown` rather
/// than failing, so a provider-side addition cannot break reads.
pub fn map_provisioning_state(raw: &str) -> InstanceState {
    PROVISIONING_STATES
        .iter()
        .find(|(label, _)| label.eq_ignore_ascii_case(raw))
        .map(|(_, state)| *state)
        .unwrap_or(InstanceState::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_labels_map_per_table() {
        assert_eq!(map_provisioning_state("Creating"), InstanceState::Pending);
        assert_eq!(map_provisioning_state("Updating"), InstanceState::Pending);
        assert_eq!(map_provisioning_state("Deleting"), InstanceState::Pending);
        assert_eq!(map_provisioning_state("Succeeded"), InstanceState::Ready);
        assert_eq!(map_provisioning_state("Failed"), InstanceState::Failed);
        assert_eq!(map_provisioning_state("Canceled"), InstanceState::Failed);
    }

    #[test]
    fn matching_ignores_case() {
        assert_eq!(map_provisioning_state("succeeded"), InstanceState::Ready);
        assert_eq!(map_provisioning_state("FAILED"), InstanceState::Failed);
    }

    #[test]
    fn unknown_labels_do_not_fail() {
        assert_eq!(map_provisioning_state("Restoring"), InstanceState::Unknown);
        assert_eq!(map_provisioning_state(""), InstanceState::Unknown);
    }
}
