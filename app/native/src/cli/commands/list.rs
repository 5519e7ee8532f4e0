//! Table output for `vbar list`.

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::bar::BlockSummary;

#[derive(Tabled)]
struct BlockRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Position")]
    position: String,
    #[tabled(rename = "Mode")]
    mode: String,
    #[tabled(rename = "Interval")]
    interval: String,
    #[tabled(rename = "Menu")]
    menu: usize,
    #[tabled(rename = "Text")]
    text: String,
}

impl From<&BlockSummary> for BlockRow {
    fn from(block: &BlockSummary) -> Self {
        Self {
            name: block.name.clone(),
            position: block.position.to_string(),
            mode: block.mode.clone(),
            interval: if block.interval == 0 { "-".to_string() } else { format!("{}s", block.interval) },
            menu: block.menu_items,
            text: block.text.clone(),
        }
    }
}

/// Formats blocks as a table.
pub fn format_blocks_table(blocks: &[BlockSummary]) -> String {
    let mut table = Table::new(blocks.iter().map(BlockRow::from));
    table.with(Style::rounded());
    table.to_string()
}
