//! Combinatorial expansion of argument lists
//!
//! Every position contributes one of its variants; positions at or after the
//! mandatory count may also be left off, but only from the tail. Fully
//! saturated combinations are then extended with each rest variant.

use crate::supplier::{BoxSupplier, RestVariant, SupplierError, Variant};
use std::collections::HashSet;
use std::hash::Hash;

/// Token used to fill absent trailing arguments on the reference side
pub const ABSENT: &str = "undefined";

/// One argument list, spelled for each runtime
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Combination {
    /// Runtime-A arguments, padded with [`ABSENT`] up to the position count
    pub reference: Vec<String>,
    /// Runtime-B arguments, exactly as generated
    pub target: Vec<String>,
}

/// Expand `positions` into every valid argument list.
///
/// `mandatory` of `None` makes every position mandatory. An empty `rest`
/// slice leaves combinations as they are.
pub fn expand(
    positions: &[BoxSupplier<'_, Variant>],
    mandatory: Option<usize>,
    rest: &[BoxSupplier<'_, RestVariant>],
) -> Result<Vec<Combination>, SupplierError> {
    let arity = positions.len();
    let mandatory = mandatory.unwrap_or(arity);

    let mut combos: Vec<Vec<Variant>> = vec![Vec::new()];
    for (idx, supplier) in positions.iter().enumerate() {
        let variants = supplier.supply()?;
        let mut next = Unique::default();
        for old in &combos {
            for y in &variants {
                if old.len() == idx {
                    let mut extended = old.clone();
                    extended.push(y.clone());
                    next.push(extended);
                    if idx >= mandatory {
                        next.push(old.clone());
                    }
                } else {
                    next.push(old.clone());
                }
            }
        }
        combos = next.items;
    }

    if !rest.is_empty() {
        let mut with_rest = Unique::default();
        for supplier in rest {
            for tail in supplier.supply()? {
                for combo in &combos {
                    if combo.len() == arity {
                        let mut full = combo.clone();
                        full.extend(tail.iter().cloned());
                        with_rest.push(full);
                    } else {
                        with_rest.push(combo.clone());
                    }
                }
            }
        }
        combos = with_rest.items;
    }

    Ok(combos
        .into_iter()
        .map(|combo| {
            let target: Vec<String> = combo.iter().map(|v| v.target.clone()).collect();
            let mut reference: Vec<String> = combo.into_iter().map(|v| v.reference).collect();
            while reference.len() < arity {
                reference.push(ABSENT.to_string());
            }
            Combination { reference, target }
        })
        .collect())
}

/// Insertion-ordered set; the first occurrence wins
struct Unique<T> {
    items: Vec<T>,
    seen: HashSet<T>,
}

impl<T> Default for Unique<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            seen: HashSet::new(),
        }
    }
}

impl<T: Clone + Eq + Hash> Unique<T> {
    fn push(&mut self, item: T) {
        if self.seen.insert(item.clone()) {
            self.items.push(item);
        }
    }
}
