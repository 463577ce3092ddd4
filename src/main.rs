use std::{fs, io::Read};

use ll1_driver::{parse_source, Error, Grammar};

fn print_help() {
    println!("Usage: ll1-driver outputs [options] grammar-file [input-file]");
    println!("outputs:");
    println!("  prod: Productions");
    println!("  nff: Nullable first and follow");
    println!("  ll1: LL(1) parsing table");
    println!("  tree: Syntax tree of the input (stdin if no input file)");
    println!("options:");
    println!("  -h: Print this help");
    println!("  -l: Print in LaTeX format");
    println!("  -j: Print in JSON format");
    println!("  -i: Print the syntax tree indented");
}

enum OutputFormat {
    Plain,
    LaTeX,
    JSON,
    Indented,
}

fn run(outputs: &[&str], output_format: &OutputFormat, files: &[String]) -> Result<(), Error> {
    let g = Grammar::parse(&fs::read_to_string(&files[0])?)?;

    for &output in outputs {
        if output == "prod" {
            let t = g.to_production_output_vec();
            println!(
                "{}",
                match output_format {
                    OutputFormat::LaTeX => t.to_latex(),
                    OutputFormat::JSON => t.to_json()?,
                    _ => t.to_plaintext(),
                }
            );
        }
        if output == "nff" {
            let nff = g.nullable_first_follow();
            let t = g.to_non_terminal_output_vec(&nff);
            println!(
                "{}",
                match output_format {
                    OutputFormat::LaTeX => t.to_latex(),
                    OutputFormat::JSON => t.to_json()?,
                    _ => t.to_plaintext(),
                }
            );
        }
        if output == "ll1" {
            let t = g.generate_ll1_parsing_table()?;
            println!(
                "{}",
                match output_format {
                    OutputFormat::LaTeX => t.to_latex(),
                    OutputFormat::JSON => t.to_json()?,
                    _ => t.to_plaintext(),
                }
            );
        }
        if output == "tree" {
            let source = match files.get(1) {
                Some(path) => fs::read_to_string(path)?,
                None => {
                    let mut source = String::new();
                    std::io::stdin().lock().read_to_string(&mut source)?;
                    source
                }
            };
            let table = g.generate_ll1_parsing_table()?;
            let t = parse_source(&table, &source)?;
            println!(
                "{}",
                match output_format {
                    OutputFormat::Plain => t.to_bracketed(),
                    OutputFormat::LaTeX => t.to_latex(),
                    OutputFormat::JSON => t.to_json()?,
                    OutputFormat::Indented => t.to_indented(),
                }
            );
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();

    let mut outputs: Vec<&str> = Vec::new();
    let args = std::env::args().skip(1).collect::<Vec<String>>();
    let mut i: usize = 0;
    while i < args.len() && ["prod", "nff", "ll1", "tree"].contains(&args[i].as_str()) {
        outputs.push(args[i].as_str());
        i += 1;
    }

    let mut output_format = OutputFormat::Plain;
    while i < args.len() && ["-h", "--help", "-l", "-j", "-i"].contains(&args[i].as_str()) {
        if args[i] == "-h" || args[i] == "--help" {
            print_help();
            return;
        } else if args[i] == "-l" {
            output_format = OutputFormat::LaTeX;
        } else if args[i] == "-j" {
            output_format = OutputFormat::JSON;
        } else if args[i] == "-i" {
            output_format = OutputFormat::Indented;
        }
        i += 1;
    }

    let files = &args[i..];
    if files.is_empty() || files.len() > 2 || outputs.is_empty() {
        print_help();
        std::process::exit(1);
    }

    if let Err(e) = run(&outputs, &output_format, files) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
