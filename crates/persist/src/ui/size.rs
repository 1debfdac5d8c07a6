const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;

/// Render a byte count the way the progress line shows it.
pub fn human_size(bytes: u64) -> String {
    match bytes {
        b if b < KB => format!("{b} B"),
        b if b < MB => format!("{:.2} KB", b as f64 / KB as f64),
        b if b < GB => format!("{:.2} MB", b as f64 / MB as f64),
        b => format!("{:.3} GB", b as f64 / GB as f64),
    }
}
