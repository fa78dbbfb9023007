//! Parses the delimited source text into ordered post records.
use crate::model::PostRecord;
use once_cell::sync::Lazy;
use regex::Regex;

/// First line of a block: `"<number>. <title>"`.
static HEADER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)\.\s*(.+)$").expect("valid regex"));

/// Split `text` into blocks separated by `-----` lines and extract one record
/// per block whose first line matches the numeric header. Blocks without a
/// header are dropped silently; that leniency is intentional. A header number
/// that does not fit in `u32` counts as malformed and drops the block too,
/// rather than surfacing later as a per-record failure. Source order is
/// preserved and duplicate numbers are kept as distinct records.
pub fn parse_posts(text: &str) -> Vec<PostRecord> {
    let mut records = Vec::new();

    for block in split_blocks(text) {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }

        let mut lines = block.lines();
        let first_line = match lines.next() {
            Some(line) => line.trim(),
            None => continue,
        };
        let Some(caps) = HEADER_RE.captures(first_line) else {
            continue;
        };
        let Ok(number) = caps[1].parse::<u32>() else {
            continue;
        };

        let content = lines.collect::<Vec<_>>().join("\n").trim().to_string();
        records.push(PostRecord {
            number,
            title: caps[2].to_string(),
            content,
        });
    }

    records
}

/// Accumulate lines into blocks, breaking on lines that are exactly `-----`.
fn split_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if line.trim_end() == "-----" {
            blocks.push(std::mem::take(&mut current));
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    blocks.push(current);
    blocks
}
