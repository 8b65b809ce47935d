//! Console operator – checkpoint prompts on stdin/stdout.

use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};

use colored::Colorize;
use refills_kernel::OperatorPort;
use refills_types::RefillsError;

pub struct ConsoleOperator<R, W> {
    input: R,
    output: W,
}

impl ConsoleOperator<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsoleOperator<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

fn console_fault(e: io::Error) -> RefillsError {
    RefillsError::Hardware {
        component: "console".to_string(),
        details: e.to_string(),
    }
}

impl<R: BufRead + Send, W: Write + Send> OperatorPort for ConsoleOperator<R, W> {
    fn ask(&mut self, prompt: &str) -> Result<String, RefillsError> {
        write!(self.output, "{} ", prompt.bold().cyan()).map_err(console_fault)?;
        self.output.flush().map_err(console_fault)?;

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => Err(RefillsError::Hardware {
                component: "console".to_string(),
                details: "input closed".to_string(),
            }),
            Ok(_) => Ok(line),
            Err(e) => Err(console_fault(e)),
        }
    }

    fn inform(&mut self, message: &str) {
        // A failed write only loses the hint; the prompt itself still fails loudly.
        let _ = writeln!(self.output, "  {}", message.yellow());
    }
}
