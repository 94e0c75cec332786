//! Navigation: deep links and sequential browsing
//!
use std::{fmt, str::FromStr};

use serde::Serialize;

use crate::{
    catalog::{Card, CatalogIndex},
    error::GalleryError,
};

const DEEP_LINK_PREFIX: &str = "card/";

/// Step direction through a visible list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Direction {
    #[strum(to_string = "previous", serialize = "prev")]
    Previous,
    Next,
}

impl Direction {
    fn step(self, index: isize) -> isize {
        match self {
            Self::Previous => index - 1,
            Self::Next => index + 1,
        }
    }
}

/// From `current` (None means "not in the list", as if at index -1), moves in
/// `direction` past cards without a display image. Returns None at either end;
/// navigation does not wrap.
pub fn step_visible(current: Option<usize>, direction: Direction, visible: &[&Card]) -> Option<usize> {
    let len = isize::try_from(visible.len()).ok()?;
    let mut next = direction.step(current.map_or(-1, |i| isize::try_from(i).unwrap_or(isize::MAX)));
    while (0..len).contains(&next) {
        let index = usize::try_from(next).ok()?;
        if visible[index].has_display_image() {
            return Some(index);
        }
        next = direction.step(next);
    }
    None
}

/// Locator for one card: `card/{label}`, optionally written with a leading `#`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeepLink {
    label: String,
}

impl DeepLink {
    pub fn for_card(catalog: &CatalogIndex, card: &Card) -> Self {
        Self {
            label: catalog.label_of(card),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl FromStr for DeepLink {
    type Err = GalleryError;

    /// Accepts `#card/SA-01A`, `card/SA-01A`, or a bare label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix('#').unwrap_or(trimmed);
        let label = trimmed.strip_prefix(DEEP_LINK_PREFIX).unwrap_or(trimmed).trim();
        if label.is_empty() || label.contains('/') {
            return Err(GalleryError::Validation {
                message: format!("invalid card link '{s}'"),
            });
        }
        Ok(Self {
            label: label.to_string(),
        })
    }
}

impl fmt::Display for DeepLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{DEEP_LINK_PREFIX}{}", self.label)
    }
}

impl CatalogIndex {
    /// Card whose display label matches, ignoring case
    pub fn resolve_by_label(&self, label: &str) -> Option<&Card> {
        let wanted = label.trim().to_uppercase();
        self.cards()
            .iter()
            .find(|card| self.label_of(card).to_uppercase() == wanted)
    }

    /// Resolves a deep link to a card that has a display image
    pub fn open(&self, link: &DeepLink) -> Option<&Card> {
        self.resolve_by_label(link.label())
            .filter(|card| card.has_display_image())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{card, framed_card, sample_catalog};

    #[test]
    fn test_step_skips_imageless() {
        let cards = [
            framed_card("sa", 1, None, "one"),
            card("sa", 2, None, "two"),
            card("sa", 3, None, "three"),
            framed_card("sa", 4, None, "four"),
        ];
        let visible: Vec<&Card> = cards.iter().collect();
        assert_eq!(step_visible(Some(0), Direction::Next, &visible), Some(3));
        assert_eq!(step_visible(Some(3), Direction::Previous, &visible), Some(0));
        assert_eq!(step_visible(Some(3), Direction::Next, &visible), None);
        assert_eq!(step_visible(Some(0), Direction::Previous, &visible), None);
    }

    #[test]
    fn test_step_from_outside() {
        let cards = [card("sa", 1, None, "one"), framed_card("sa", 2, None, "two")];
        let visible: Vec<&Card> = cards.iter().collect();
        assert_eq!(step_visible(None, Direction::Next, &visible), Some(1));
        assert_eq!(step_visible(None, Direction::Previous, &visible), None);
        assert_eq!(step_visible(None, Direction::Next, &[]), None);
    }

    #[test]
    fn test_step_all_imageless() {
        let cards = [card("sa", 1, None, "one"), card("sa", 2, None, "two")];
        let visible: Vec<&Card> = cards.iter().collect();
        for start in 0..visible.len() {
            assert_eq!(step_visible(Some(start), Direction::Next, &visible), None);
            assert_eq!(step_visible(Some(start), Direction::Previous, &visible), None);
        }
    }

    #[test]
    fn test_deep_link_parse() {
        let link: DeepLink = "#card/sa-01a".parse().unwrap();
        assert_eq!(link.label(), "sa-01a");
        assert_eq!(link.to_string(), "card/sa-01a");
        assert_eq!("SA-02B".parse::<DeepLink>().unwrap().label(), "SA-02B");
        assert!("card/".parse::<DeepLink>().is_err());
        assert!("gallery/x/y".parse::<DeepLink>().is_err());
    }

    #[test]
    fn test_resolve_and_open() {
        let catalog = sample_catalog();
        let card = catalog.resolve_by_label("sa-01a").expect("resolves");
        assert_eq!(card.name, "Leaky Lenny");

        let link = DeepLink::for_card(&catalog, card);
        assert_eq!(link.to_string(), "card/SA-01A");
        assert!(catalog.open(&link).is_some());

        // SA-02B exists but has no image
        assert!(catalog.resolve_by_label("SA-02B").is_some());
        let pending: DeepLink = "card/SA-02B".parse().unwrap();
        assert!(catalog.open(&pending).is_none());

        assert!(catalog.resolve_by_label("XX-99").is_none());
    }
}
