use std::path::Path;

use miette::Result;

use pe::eval::report::{format_text, read_report};

pub fn run(file: String) -> Result<()> {
    let report = read_report(Path::new(&file))?;
    print!("{}", format_text(&report));
    Ok(())
}
