use crate::Result;
use crate::provider::ProviderApi;
use crate::types::VmSizeOffering;

/// Full size catalog for a region, following continuation links until the
/// provider runs out of pages. Fetched fresh on every call; regional
/// availability shifts too often to cache.
pub async fn fetch_catalog(api: &dyn ProviderApi, region: &str) -> Result<Vec<VmSizeOffering>> {
    let mut catalog = Vec::new();
    let mut next: Option<String> = None;
    loop {
        let page = api.list_vm_sizes(region, next.as_deref()).await?;
        catalog.extend(page.offerings);
        match page.next {
            Some(link) => next = Some(link),
            None => break,
        }
    }
    Ok(catalog)
}

/// Smallest offering that satisfies both minimums, ordered by memory and
/// then by cores. Larger-than-necessary offerings never win.
pub fn best_fit(
    catalog: &[VmSizeOffering],
    min_memory_mb: i32,
    min_cores: i32,
) -> Option<&VmSizeOffering> {
    catalog
        .iter()
        .filter(|offering| offering.memory_mb >= min_memory_mb && offering.cores >= min_cores)
        .min_by_key(|offering| (offering.memory_mb, offering.cores))
}

/// Exact-name lookup, for resolving a machine's size label back into
/// core and memory numbers.
pub fn by_name<'a>(catalog: &'a [VmSizeOffering], name: &str) -> Option<&'a VmSizeOffering> {
    catalog.iter().find(|offering| offering.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, StubApi};

    fn offering(name: &str, cores: i32, memory_mb: i32) -> VmSizeOffering {
        VmSizeOffering {
            name: name.into(),
            cores,
            memory_mb,
        }
    }

    #[test]
    fn best_fit_picks_smallest_adequate_offering() {
        let catalog = vec![
            offering("b1", 2, 2048),
            offering("b2", 2, 4096),
            offering("b2x", 4, 4096),
            offering("b3", 2, 8192),
        ];

        let picked = best_fit(&catalog, 3000, 2).unwrap();
        assert_eq!(picked.name, "b2");
        assert_eq!((picked.memory_mb, picked.cores), (4096, 2));
    }

    #[test]
    fn best_fit_orders_by_memory_before_cores() {
        // both qualify; the lower-memory one wins even with more cores
        let catalog = vec![offering("lean", 8, 4096), offering("fat", 2, 8192)];
        assert_eq!(best_fit(&catalog, 2048, 2).unwrap().name, "lean");
    }

    #[test]
    fn best_fit_requires_both_minimums() {
        let catalog = vec![offering("tall", 1, 16384), offering("wide", 8, 1024)];
        assert!(best_fit(&catalog, 2048, 2).is_none());
        assert!(best_fit(&[], 1, 1).is_none());
    }

    #[test]
    fn best_fit_never_beats_a_qualifying_candidate() {
        let catalog = vec![
            offering("a", 4, 3072),
            offering("b", 2, 3072),
            offering("c", 16, 2048),
            offering("d", 8, 65536),
        ];
        let (min_memory_mb, min_cores) = (1500, 2);

        let picked = best_fit(&catalog, min_memory_mb, min_cores).unwrap();
        for candidate in catalog
            .iter()
            .filter(|o| o.memory_mb >= min_memory_mb && o.cores >= min_cores)
        {
            assert!(
                (picked.memory_mb, picked.cores) <= (candidate.memory_mb, candidate.cores),
                "{} should not beat {}",
                candidate.name,
                picked.name
            );
        }
    }

    #[test]
    fn by_name_finds_exact_labels_only() {
        let catalog = vec![offering("Standard_B2s", 2, 4096)];
        assert!(by_name(&catalog, "Standard_B2s").is_some());
        assert!(by_name(&catalog, "standard_b2s").is_none());
        assert!(by_name(&catalog, "Standard_B2").is_none());
    }

    #[tokio::test]
    async fn fetch_catalog_walks_every_page() {
        let api = StubApi::paged(vec![
            vec![offering("a", 1, 1024), offering("b", 2, 2048)],
            vec![offering("c", 4, 4096)],
            vec![offering("d", 8, 8192)],
        ]);

        let catalog = fetch_catalog(&api, testing::REGION).await.unwrap();
        let names: Vec<&str> = catalog.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn fetch_catalog_handles_a_single_page() {
        let api = StubApi::one_page(vec![offering("only", 2, 4096)]);
        let catalog = fetch_catalog(&api, testing::REGION).await.unwrap();
        assert_eq!(catalog.len(), 1);
    }
}
