use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Geographic themes shared by regions and dungeon types.
    ///
    /// A dungeon type is eligible in a region when their theme sets intersect.
    /// A type with no themes is "untagged" and eligible everywhere.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ThemeTags: u8 {
        const COASTAL = 1 << 0;
        const FOREST = 1 << 1;
        const DESERT = 1 << 2;
        const MOUNTAIN = 1 << 3;
        const SWAMP = 1 << 4;
    }
}

impl ThemeTags {
    /// True when a dungeon type with `self` themes may spawn in a region tagged `region`.
    pub fn eligible_in(self, region: ThemeTags) -> bool {
        self.is_empty() || self.intersects(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untagged_is_eligible_everywhere() {
        assert!(ThemeTags::empty().eligible_in(ThemeTags::SWAMP));
        assert!(ThemeTags::empty().eligible_in(ThemeTags::empty()));
    }

    #[test]
    fn tagged_needs_overlap() {
        let lair = ThemeTags::FOREST;
        assert!(lair.eligible_in(ThemeTags::FOREST | ThemeTags::MOUNTAIN));
        assert!(!lair.eligible_in(ThemeTags::DESERT));
        assert!(!lair.eligible_in(ThemeTags::empty()));
    }
}
