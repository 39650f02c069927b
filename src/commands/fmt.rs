use std::path::Path;

use console::style;
use miette::Result;

use pe::config::write_atomic;
use pe::format::format_file;

pub fn run(files: Vec<String>, write: bool, output: Option<String>, check: bool) -> Result<()> {
    let format = super::parse_format(output.as_deref())?;
    let mut unformatted = 0;

    for file in &files {
        let path = Path::new(file);
        let formatted = format_file(path, format)?;

        if check {
            if formatted.is_changed() {
                unformatted += 1;
                print!("{}", formatted.diff(path));
            }
        } else if write {
            if formatted.is_changed() {
                write_atomic(path, &formatted.formatted)?;
                println!("{} {}", style("formatted").green(), file);
            }
        } else {
            print!("{}", formatted.formatted);
        }
    }

    if unformatted > 0 {
        eprintln!(
            "\n{} {} file(s) need formatting",
            style("✗").red().bold(),
            unformatted
        );
        std::process::exit(1);
    }

    Ok(())
}
