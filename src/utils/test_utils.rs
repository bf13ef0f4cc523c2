use std::io::Write;

use tempfile::NamedTempFile;

use crate::io::input::ColorTable;

/// Small excerpt of a GIF brain anatomy color table.
pub const SAMPLE_COLOR_TABLE: &str = "\
# Color table file BrainAnatomyLabelsV3_0.txt
# 4 values
0 Background 0 0 0 0
31 Right_Amygdala 103 255 255 255
32 Left_Amygdala 103 255 255 255
48 Right_Hippocampus 220 216 20 255
";

pub fn sample_color_table() -> ColorTable {
    ColorTable::parse("gif", SAMPLE_COLOR_TABLE).expect("sample color table parses")
}

/// Writes `contents` to a temporary file that lives as long as the handle.
pub fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("failed to write temp file");
    file
}
