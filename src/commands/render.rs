use std::path::{Path, PathBuf};

use console::style;
use miette::Result;
use serde_json::Value;

use pe::config::{config_dir, parse_document, read_file, Format};
use pe::template::{Template, Variables, DEFAULT_ESCAPE_MARKER, DEFAULT_MAX_DEPTH};

fn parse_data(data: Vec<String>) -> Result<Vec<(String, String)>> {
    data.into_iter()
        .map(|kv| match kv.split_once('=') {
            Some((key, value)) => Ok((key.to_string(), value.to_string())),
            None => Err(miette::miette!("invalid variable '{}', expected KEY=VALUE", kv)),
        })
        .collect()
}

pub fn run(
    template: String,
    data: Vec<String>,
    vars: Option<String>,
    base_dir: Option<String>,
    check: bool,
) -> Result<()> {
    let settings = super::settings()?;
    let template_path = Path::new(&template);
    let source = read_file(template_path)?;

    let mut variables = match &vars {
        Some(file) => {
            let path = Path::new(file);
            parse_document::<Variables>(&read_file(path)?, Format::from_path(path), path)?
        }
        None => Variables::new(),
    };
    for (key, value) in parse_data(data)? {
        variables.insert(key, Value::String(value));
    }

    let base_dir = base_dir
        .map(PathBuf::from)
        .unwrap_or_else(|| config_dir(template_path));

    let template = Template::new(source, &variables)
        .with_base_dir(base_dir)
        .with_max_depth(settings.max_depth.unwrap_or(DEFAULT_MAX_DEPTH))
        .with_escape_marker(
            settings
                .escape_marker
                .as_deref()
                .unwrap_or(DEFAULT_ESCAPE_MARKER),
        );

    if check {
        let problems = template.validate();
        if problems.is_empty() {
            println!("{} Template is valid!", style("✓").green().bold());
            return Ok(());
        }
        for problem in &problems {
            println!("  {} {}", style("✗").red(), problem);
        }
        std::process::exit(1);
    }

    print!("{}", template.process()?);
    Ok(())
}
