use serde::{Deserialize, Serialize};

use crate::registry::Tile;
use crate::spotlight::matches_key;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Regular-tile page size per orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSizes {
    pub portrait: usize,
    pub landscape: usize,
}

impl Default for PageSizes {
    fn default() -> Self {
        Self {
            portrait: 4,
            landscape: 2,
        }
    }
}

impl PageSizes {
    /// Page size for `orientation`, never below one.
    pub fn get(&self, orientation: Orientation) -> usize {
        let size = match orientation {
            Orientation::Portrait => self.portrait,
            Orientation::Landscape => self.landscape,
        };
        size.max(1)
    }
}

/// Bucketed tiles derived from the registry on every change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileLayout {
    /// Usually zero or one tile; duplicates are kept and the UI shows the first.
    pub spotlight: Vec<Tile>,
    pub screenshare: Vec<Tile>,
    pub regular_pages: Vec<Vec<Tile>>,
}

impl TileLayout {
    pub fn featured(&self) -> Option<&Tile> {
        self.spotlight.first()
    }

    pub fn page_count(&self) -> usize {
        self.regular_pages.len()
    }

    /// Regular page at `index`, clamped to the last page. Empty when there are no pages.
    pub fn page(&self, index: usize) -> &[Tile] {
        match self.regular_pages.len() {
            0 => &[],
            len => &self.regular_pages[index.min(len - 1)],
        }
    }

    pub fn total(&self) -> usize {
        self.spotlight.len()
            + self.screenshare.len()
            + self.regular_pages.iter().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Split `tiles` into spotlight, screenshare and regular pages in one stable pass.
///
/// Pages hold at most `page_size` tiles (a zero size is treated as one) and
/// are never padded.
pub fn partition(tiles: &[Tile], spotlight_key: Option<&str>, page_size: usize) -> TileLayout {
    let page_size = page_size.max(1);
    let mut layout = TileLayout::default();
    let mut page: Vec<Tile> = Vec::with_capacity(page_size);

    for tile in tiles {
        if matches_key(spotlight_key, tile) {
            layout.spotlight.push(tile.clone());
        } else if !tile.id.is_regular() {
            layout.screenshare.push(tile.clone());
        } else {
            page.push(tile.clone());
            if page.len() == page_size {
                layout
                    .regular_pages
                    .push(std::mem::replace(&mut page, Vec::with_capacity(page_size)));
            }
        }
    }

    if !page.is_empty() {
        layout.regular_pages.push(page);
    }

    layout
}
