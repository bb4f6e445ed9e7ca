use std::collections::HashMap;

use crate::domain::{SlotCategory, TimeSlot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryUsage {
    pub category: SlotCategory,
    pub count: usize,
    pub recommended: Option<(usize, usize)>,
}

impl CategoryUsage {
    /// `None` for categories without a recommendation.
    pub fn within_recommendation(&self) -> Option<bool> {
        self.recommended
            .map(|(min, max)| (min..=max).contains(&self.count))
    }
}

/// Slot counts per category, in category order.
pub fn category_usage<'a>(slots: impl IntoIterator<Item = &'a TimeSlot>) -> Vec<CategoryUsage> {
    let mut counts: HashMap<SlotCategory, usize> = HashMap::new();
    for slot in slots {
        *counts.entry(slot.category).or_insert(0) += 1;
    }

    SlotCategory::ALL
        .into_iter()
        .map(|category| CategoryUsage {
            category,
            count: counts.get(&category).copied().unwrap_or(0),
            recommended: category.meta().recommended,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::domain::{SlotCategory, default_time_ranges};
    use crate::slots::generate_slots;

    use super::category_usage;

    #[test]
    fn counts_slots_against_recommendations() {
        let mut slots = generate_slots(&[], &default_time_ranges());
        slots[0].category = SlotCategory::Personal;
        slots[3].category = SlotCategory::Personal;
        slots[5].category = SlotCategory::Business;

        let usage = category_usage(&slots);
        assert_eq!(usage.len(), SlotCategory::ALL.len());

        let personal = usage[0];
        assert_eq!(personal.category, SlotCategory::Personal);
        assert_eq!(personal.count, 2);
        assert_eq!(personal.within_recommendation(), Some(true));

        let business = usage
            .iter()
            .find(|entry| entry.category == SlotCategory::Business)
            .expect("business is listed");
        assert_eq!(business.within_recommendation(), Some(false));

        let unassigned = usage
            .iter()
            .find(|entry| entry.category == SlotCategory::Unassigned)
            .expect("unassigned is listed");
        assert_eq!(unassigned.count, 11);
        assert_eq!(unassigned.within_recommendation(), None);
    }
}
