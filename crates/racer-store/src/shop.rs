//! Shop listing over the catalog's shop sets.

use racer_protocol::{ShopComponentView, ShopReply, ShopSetView};

use crate::{Catalog, ShopSet};

/// Lists every shop set in catalog order.
pub fn show_all(catalog: &dyn Catalog) -> ShopReply {
    let sets = catalog.shop_sets();
    ShopReply {
        shop_sets_count: sets.len(),
        from: None,
        to: None,
        shop_sets: sets.iter().map(|set| view(set, catalog)).collect(),
    }
}

/// Lists the shop sets in the inclusive index range `[from, to]`.
///
/// Bounds are normalized first (see [`normalize_range`]); the reply echoes
/// the normalized bounds. An empty catalog lists nothing and echoes none.
pub fn show_some(catalog: &dyn Catalog, from: i64, to: i64) -> ShopReply {
    let sets = catalog.shop_sets();
    match normalize_range(sets.len(), from, to) {
        Some((from, to)) => ShopReply {
            shop_sets_count: sets.len(),
            from: Some(from),
            to: Some(to),
            shop_sets: sets[from..=to]
                .iter()
                .map(|set| view(set, catalog))
                .collect(),
        },
        None => ShopReply {
            shop_sets_count: 0,
            from: None,
            to: None,
            shop_sets: Vec::new(),
        },
    }
}

/// Clamps a requested index range to a list of `count` items.
///
/// A negative bound becomes 0, a bound past the end becomes the last index,
/// and a reversed range is swapped. Returns `None` when `count` is 0.
pub fn normalize_range(count: usize, from: i64, to: i64) -> Option<(usize, usize)> {
    let last = count.checked_sub(1)?;
    let clamp = |bound: i64| -> usize {
        match usize::try_from(bound) {
            Ok(index) => index.min(last),
            Err(_) if bound < 0 => 0,
            Err(_) => last,
        }
    };

    let (from, to) = (clamp(from), clamp(to));
    Some(if from > to { (to, from) } else { (from, to) })
}

fn view(set: &ShopSet, catalog: &dyn Catalog) -> ShopSetView {
    ShopSetView {
        name: set.name.clone(),
        price: set.price,
        components: set
            .components
            .iter()
            .filter_map(|component| {
                let name = catalog.resource_name(component.resource)?;
                Some(ShopComponentView {
                    name: name.to_string(),
                    count: component.count,
                })
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_range_in_bounds() {
        assert_eq!(normalize_range(10, 2, 5), Some((2, 5)));
    }

    #[test]
    fn test_normalize_range_clamps_upper() {
        assert_eq!(normalize_range(10, 4, 16), Some((4, 9)));
    }

    #[test]
    fn test_normalize_range_negative_becomes_zero() {
        assert_eq!(normalize_range(10, -3, 2), Some((0, 2)));
        assert_eq!(normalize_range(10, -1, -1), Some((0, 0)));
    }

    #[test]
    fn test_normalize_range_swaps_reversed() {
        assert_eq!(normalize_range(10, 7, 3), Some((3, 7)));
    }

    #[test]
    fn test_normalize_range_both_past_end() {
        assert_eq!(normalize_range(10, 20, 30), Some((9, 9)));
    }

    #[test]
    fn test_normalize_range_empty_list() {
        assert_eq!(normalize_range(0, 0, 5), None);
    }
}
