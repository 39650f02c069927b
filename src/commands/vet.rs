use std::path::PathBuf;

use console::style;
use miette::Result;

use pe::lint::{collect_config_files, vet_file};

pub fn run(paths: Vec<String>, exclude: Vec<String>) -> Result<()> {
    let paths: Vec<PathBuf> = paths.into_iter().map(PathBuf::from).collect();
    let files = collect_config_files(&paths, &exclude)?;

    if files.is_empty() {
        super::warn("no config files found");
        return Ok(());
    }

    let mut errors = 0;
    for file in &files {
        match vet_file(file) {
            Ok(_) => println!("{}: {}", file.display(), style("OK").green()),
            Err(e) => {
                errors += 1;
                println!("{}: {} {}", file.display(), style("Error:").red().bold(), e);
            }
        }
    }

    if errors > 0 {
        println!(
            "\n{} {} of {} file(s) failed validation",
            style("✗").red().bold(),
            errors,
            files.len()
        );
        std::process::exit(1);
    }

    Ok(())
}
