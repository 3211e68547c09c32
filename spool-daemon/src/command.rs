//! External command templates with `{printer}` / `{path}` substitution.

use std::ffi::OsString;
use std::path::Path;

use spool_core::config::{PATH_PLACEHOLDER, PRINTER_PLACEHOLDER};
use spool_core::PrinterTarget;

/// A program plus argument template, e.g. `lp -d {printer} {path}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    program: String,
    args: Vec<String>,
}

impl CommandTemplate {
    /// Returns `None` for an empty argv.
    pub fn new(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Substitute placeholders. An argument that is exactly `{path}` is passed
    /// through as the raw OS path, so non-UTF-8 file names survive.
    pub fn render(&self, printer: &PrinterTarget, path: Option<&Path>) -> (OsString, Vec<OsString>) {
        let args = self
            .args
            .iter()
            .map(|arg| match path {
                Some(path) if arg == PATH_PLACEHOLDER => path.as_os_str().to_os_string(),
                _ => {
                    let mut rendered = arg.replace(PRINTER_PLACEHOLDER, &printer.0);
                    if let Some(path) = path {
                        rendered =
                            rendered.replace(PATH_PLACEHOLDER, &path.to_string_lossy());
                    }
                    OsString::from(rendered)
                }
            })
            .collect();
        (OsString::from(&self.program), args)
    }

    /// Human-readable rendering for logs and reports.
    pub fn display(&self, printer: &PrinterTarget, path: Option<&Path>) -> String {
        let (program, args) = self.render(printer, path);
        std::iter::once(program)
            .chain(args)
            .map(|part| part.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
