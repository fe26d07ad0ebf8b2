//! Interactive review: pauses between pairs and asks for missing Tsys values.

use masercore::interface::TsysSource;
use masercore::pipeline::{PairOutcome, PairReport};
use masercore::Polarization;
use std::cell::RefCell;
use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};

pub struct Operator<R, W> {
    input: RefCell<R>,
    output: RefCell<W>,
}

impl Operator<BufReader<Stdin>, Stdout> {
    pub fn console() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R: BufRead, W: Write> Operator<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: RefCell::new(input),
            output: RefCell::new(output),
        }
    }

    fn prompt(&self, message: &str) -> io::Result<Option<String>> {
        {
            let mut output = self.output.borrow_mut();
            write!(output, "{message}")?;
            output.flush()?;
        }
        let mut line = String::new();
        let read = self.input.borrow_mut().read_line(&mut line)?;
        Ok((read > 0).then(|| line.trim().to_string()))
    }

    /// Prints a pair summary and blocks until the operator presses Enter.
    pub fn review(&self, report: &PairReport) -> io::Result<()> {
        let summary = match &report.outcome {
            PairOutcome::Calibrated(spectra) => format!(
                "pair {} ({} / {}): {} channels, SNR A {:.2}, B {:.2}, avg {:.2}",
                report.index,
                report.signal_file,
                report.reference_file,
                spectra.axis_mhz.len(),
                spectra.snr_a,
                spectra.snr_b,
                spectra.snr_average
            ),
            PairOutcome::Rejected { reason } => format!(
                "pair {} ({} / {}) rejected: {reason}",
                report.index, report.signal_file, report.reference_file
            ),
        };
        writeln!(self.output.borrow_mut(), "{summary}")?;
        self.prompt("press Enter to continue ")?;
        Ok(())
    }

    #[cfg(test)]
    fn into_output(self) -> W {
        self.output.into_inner()
    }
}

impl<R: BufRead, W: Write> TsysSource for Operator<R, W> {
    fn request_tsys(&self, scan_number: u32, polarization: Polarization) -> Option<f64> {
        let message = format!(
            "scan {scan_number} logs zero Tsys for {polarization}; enter a value (blank to reject): "
        );
        loop {
            let answer = self.prompt(&message).ok().flatten()?;
            if answer.is_empty() {
                return None;
            }
            match answer.parse::<f64>() {
                Ok(value) if value.is_finite() && value != 0.0 => return Some(value),
                _ => {
                    writeln!(self.output.borrow_mut(), "{answer:?} is not a usable Tsys").ok()?;
                }
            }
        }
    }
}
