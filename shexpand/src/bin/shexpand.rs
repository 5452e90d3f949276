use std::sync::Arc;

use arrrg::CommandLine;
use indicio::{clue, stdio::StdioEmitter, ALWAYS, INFO};

use shexpand::{expand_with_options, ExpandOptions, ShellGlob, Variables, COLLECTOR};

#[derive(Debug, Default, Eq, PartialEq, arrrg_derive::CommandLine)]
struct Options {
    #[arrrg(flag, "Print clues to stderr while expanding.")]
    verbose: bool,
    #[arrrg(nested)]
    expand: ExpandOptions,
}

fn main() {
    let (options, free) = Options::from_command_line("Usage: shexpand [OPTIONS] STRING [ARG...]");
    if free.is_empty() {
        eprintln!("USAGE: shexpand [OPTIONS] STRING [ARG...]");
        std::process::exit(129);
    }
    if options.verbose {
        COLLECTOR.register(Arc::new(StdioEmitter));
        COLLECTOR.set_verbosity(INFO);
        clue!(COLLECTOR, ALWAYS, {
            new_process: std::env::args().map(String::from).collect::<Vec<_>>(),
        });
    }
    let mut vars = Variables::from_env();
    vars.set_program_name("shexpand");
    vars.set_positional(free[1..].iter().cloned());
    match expand_with_options(&mut vars, &ShellGlob, &options.expand, &free[0]) {
        Ok(output) => {
            println!("{}", output);
        }
        Err(err) => {
            eprintln!("shexpand: {}", err);
            std::process::exit(1);
        }
    }
}
