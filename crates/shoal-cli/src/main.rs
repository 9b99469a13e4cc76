//! Command-line entry point: `shoal` starts a REPL, `shoal script.sl` runs
//! a file. Exit codes follow sysexits: 64 usage, 65 compile error, 66 file
//! not readable, 70 runtime error.

use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use shoal_lang::{Interpreter, compile};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    match args.len() {
        1 => repl(),
        2 => run_file(&args[1]),
        _ => {
            eprintln!("usage: shoal [script]");
            ExitCode::from(64)
        }
    }
}

fn run_file(path: &str) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("shoal: cannot read {path}: {e}");
            return ExitCode::from(66);
        }
    };

    let program = match compile(&source) {
        Ok(program) => program,
        Err(errors) => {
            for e in &errors {
                eprintln!("{e}");
            }
            return ExitCode::from(65);
        }
    };

    let mut interpreter = Interpreter::new();
    let result = interpreter.run(&program);
    // anything printed before a runtime error still reaches stdout
    interpreter.flush_output();
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(70)
        }
    }
}

fn repl() -> ExitCode {
    let mut interpreter = Interpreter::new();
    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            return ExitCode::SUCCESS;
        }

        line.clear();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => return ExitCode::SUCCESS,
            Ok(_) => {}
            Err(e) => {
                eprintln!("shoal: {e}");
                return ExitCode::from(74);
            }
        }
        if line.trim().is_empty() {
            continue;
        }

        // errors never kill the session; bindings from earlier lines survive
        match compile(&line) {
            Ok(program) => {
                let result = interpreter.run(&program);
                interpreter.flush_output();
                if let Err(e) = result {
                    eprintln!("{e}");
                }
            }
            Err(errors) => {
                for e in &errors {
                    eprintln!("{e}");
                }
            }
        }
    }
}
