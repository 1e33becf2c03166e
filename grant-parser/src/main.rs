use std::env;
use std::fs;
use std::io::{self, Read};
use std::process;

use grant_parser::{extract_records, PatentRecord, SchemaVariant};

fn main() {
    if let Err(err) = run() {
        eprintln!("{}: {err}", env!("CARGO_PKG_NAME"));
        process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut args = env::args();
    let program = args
        .next()
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());

    let mut variant: Option<SchemaVariant> = None;
    let mut input: Option<Input> = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            flag if is_help_flag(flag) => {
                print_help(&program);
                return Ok(());
            }
            flag if is_version_flag(flag) => {
                println!("{}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--variant" => {
                let value = args
                    .next()
                    .ok_or_else(|| format!("--variant needs a value\n{}", usage(&program)))?;
                variant = Some(
                    value
                        .parse::<SchemaVariant>()
                        .map_err(|err| format!("{err}"))?,
                );
            }
            _ if input.is_some() => {
                return Err(format!("unexpected argument: {arg}\n{}", usage(&program)));
            }
            "-" => input = Some(Input::Stdin),
            path => input = Some(Input::File(path.to_string())),
        }
    }

    let input = input.unwrap_or(Input::Stdin);
    let variant = variant.unwrap_or_else(|| match &input {
        Input::File(path) => SchemaVariant::from_member_name(path),
        Input::Stdin => SchemaVariant::XmlGenB,
    });

    let bytes = match &input {
        Input::Stdin => read_stdin()?,
        Input::File(path) => read_file(path)?,
    };

    let records = extract_records(bytes.as_slice(), variant)
        .collect::<Result<Vec<PatentRecord>, _>>()
        .map_err(|err| format!("failed to split input: {err}"))?;
    let json = serde_json::to_string_pretty(&records)
        .map_err(|err| format!("failed to serialize JSON: {err}"))?;
    println!("{json}");
    Ok(())
}

enum Input {
    Stdin,
    File(String),
}

fn is_help_flag(arg: &str) -> bool {
    arg == "-h" || arg == "--help"
}

fn is_version_flag(arg: &str) -> bool {
    arg == "-V" || arg == "--version"
}

fn read_file(path: &str) -> Result<Vec<u8>, String> {
    fs::read(path).map_err(|err| format!("failed to read '{path}': {err}"))
}

fn read_stdin() -> Result<Vec<u8>, String> {
    let mut buf = Vec::new();
    io::stdin()
        .read_to_end(&mut buf)
        .map_err(|err| format!("failed to read stdin: {err}"))?;
    Ok(buf)
}

fn print_help(program: &str) {
    println!(
        "{}\n\nOptions:\n  --variant NAME  legacy-text, xml-gen-a or xml-gen-b\n  -h, --help      Show this message\n  -V, --version   Print package version",
        usage(program)
    );
}

fn usage(program: &str) -> String {
    format!(
        "Usage: {program} [--variant NAME] [GRANT_FILE|-]\n\n\
         Provide an unpacked bulk grant file or '-' to read from stdin. \
         Without --variant the format is chosen from the file name \
         (pftaps* legacy text, pg0* first XML generation, anything else \
         current XML); stdin defaults to the current XML generation."
    )
}
