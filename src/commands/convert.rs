use std::path::Path;

use console::style;
use miette::Result;

pub fn run(input: String, output: String, format: Option<String>) -> Result<()> {
    let format = super::parse_format(format.as_deref())?;
    let written = pe::format::convert_file(Path::new(&input), Path::new(&output), format)?;

    println!(
        "{} Converted {} to {} ({})",
        style("✓").green().bold(),
        input,
        style(&output).cyan(),
        written
    );
    Ok(())
}
