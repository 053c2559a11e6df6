//! DICE - a small imperative language with structured parallelism

use std::env as std_env;
use std::fs;
use std::process;

use dice::lexer::Lexer;
use dice::parser::Parser;
use dice::report::{self, codes, Diagnostic};
use dice::runtime::{ErrorKind, Evaluator};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    let args: Vec<String> = std_env::args().collect();

    let mut file: Option<String> = None;
    let mut code: Option<String> = None;
    let mut check_only = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                return;
            }
            "-v" | "--version" => {
                println!("dice {}", VERSION);
                return;
            }
            "-c" => {
                if i + 1 < args.len() {
                    code = Some(args[i + 1].clone());
                    i += 1;
                } else {
                    eprintln!("dice: option -c requires an argument");
                    process::exit(1);
                }
            }
            "-n" => {
                check_only = true;
            }
            arg if arg.starts_with('-') => {
                eprintln!("dice: unknown option: {}", arg);
                process::exit(1);
            }
            _ => {
                if file.is_none() {
                    file = Some(args[i].clone());
                } else {
                    eprintln!("dice: unexpected argument: {}", args[i]);
                    process::exit(1);
                }
            }
        }
        i += 1;
    }

    if let Some(cmd) = code {
        run_source(&cmd, "<cmd>", check_only);
    } else if let Some(path) = file {
        match fs::read_to_string(&path) {
            Ok(content) => run_source(&content, &path, check_only),
            Err(e) => {
                eprintln!("dice: cannot open '{}': {}", path, e);
                process::exit(1);
            }
        }
    } else {
        print_help();
        process::exit(1);
    }
}

fn print_help() {
    println!("Usage: dice [options] <file>");
    println!();
    println!("Options:");
    println!("  -c CMD    Execute CMD as a string");
    println!("  -n        Check syntax only");
    println!("  -v        Show version");
    println!("  -h        Show help");
    println!();
    println!("Examples:");
    println!("  dice pipeline.dice          Run a program");
    println!("  dice -n pipeline.dice       Check syntax");
    println!("  dice -c 'func main() {{ print(\"hi\"); }}'");
}

/// Run the full pipeline over one source text, rendering any failure as
/// a diagnostic and exiting non-zero.
fn run_source(source: &str, path: &str, check_only: bool) {
    let tokens = match Lexer::new(source).tokenize() {
        Ok(tokens) => tokens,
        Err(e) => fail(codes::LEX_ERROR, &e.message, path, source, e.span.line, e.span.column),
    };

    let program = match Parser::new(tokens).parse_program() {
        Ok(program) => program,
        Err(e) => fail(codes::PARSE_ERROR, &e.message, path, source, e.line, e.column),
    };

    if check_only {
        println!("{}: OK", path);
        return;
    }

    if let Err(e) = Evaluator::new().eval_program(&program) {
        let code = match e.kind {
            ErrorKind::Name => codes::NAME_ERROR,
            ErrorKind::Runtime => codes::RUNTIME_ERROR,
        };
        fail(code, &format!("{}: {}", e.kind, e.message), path, source, e.line, e.column);
    }
}

fn fail(code: &str, message: &str, path: &str, source: &str, line: usize, column: usize) -> ! {
    let mut diag = Diagnostic::error(message).with_code(code);
    if line > 0 {
        diag = diag.at(path, line, column);
        if let Some(src) = report::get_source_line(source, line) {
            diag = diag.with_source(src);
        }
    }
    diag.emit();
    process::exit(1);
}
