//! A minimal in-process [`sieve_engine::host::Host`] for the `run`
//! subcommand: parses a flat RFC 5322 message file and logs rather than
//! actually submits SMTP or checks a duplicate-suppression store. Good
//! enough to exercise a script's logic from the command line; not a real
//! mail delivery agent.

use std::time::Duration;

use sieve_engine::host::{DuplicateTransaction, Host, MessageContext, SmtpHandle};
use sieve_types::{ScriptLocation, VmResult};

/// One parsed message: headers in file order (duplicates kept, as RFC 5322
/// allows repeated header fields) and the body past the first blank line.
#[derive(Debug)]
pub struct DemoMessage {
    headers: Vec<(String, String)>,
    body: String,
}

impl DemoMessage {
    pub fn parse(raw: &str) -> Self {
        let mut headers = Vec::new();
        let mut lines = raw.split("\r\n").flat_map(|l| l.split('\n'));
        let mut body_lines = Vec::new();
        let mut in_body = false;
        let mut current: Option<(String, String)> = None;

        for line in &mut lines {
            if in_body {
                body_lines.push(line);
                continue;
            }
            if line.is_empty() {
                in_body = true;
                if let Some(h) = current.take() {
                    headers.push(h);
                }
                continue;
            }
            if (line.starts_with(' ') || line.starts_with('\t')) && current.is_some() {
                if let Some((_, value)) = current.as_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }
            if let Some(h) = current.take() {
                headers.push(h);
            }
            match line.split_once(':') {
                Some((name, value)) => current = Some((name.trim().to_string(), value.trim().to_string())),
                None => continue,
            }
        }
        if let Some(h) = current.take() {
            headers.push(h);
        }

        Self { headers, body: body_lines.join("\n") }
    }
}

impl MessageContext for DemoMessage {
    fn header_values(&self, name: &str) -> Vec<String> {
        self.headers.iter().filter(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, v)| v.clone()).collect()
    }

    /// No real SMTP envelope is available from a flat file; `from`/`to`
    /// fall back to the `From`/`To` header, which is close enough for a
    /// command-line demo but not what a real MTA would hand the engine.
    fn envelope(&self, part: &str) -> Vec<String> {
        match part.to_ascii_lowercase().as_str() {
            "from" => self.header_values("From"),
            "to" => self.header_values("To"),
            _ => Vec::new(),
        }
    }

    fn size(&self) -> u64 {
        self.body.len() as u64
    }

    fn body_text(&self) -> &str {
        &self.body
    }
}

#[derive(Debug)]
pub struct DemoSmtp;

impl SmtpHandle for DemoSmtp {
    fn set_from(&mut self, from: &str) -> VmResult<()> {
        log::info!("smtp: MAIL FROM:<{from}>");
        Ok(())
    }

    fn add_recipient(&mut self, to: &str) -> VmResult<()> {
        log::info!("smtp: RCPT TO:<{to}>");
        Ok(())
    }

    fn write_body(&mut self, chunk: &[u8]) -> VmResult<()> {
        log::debug!("smtp: {} bytes of body", chunk.len());
        Ok(())
    }

    fn finish(self: Box<Self>) -> VmResult<()> {
        log::info!("smtp: submission complete");
        Ok(())
    }
}

#[derive(Debug)]
pub struct DemoDuplicate;

impl DuplicateTransaction for DemoDuplicate {
    fn check(&mut self, key: &str) -> VmResult<bool> {
        log::debug!("duplicate check: {key}");
        Ok(false)
    }

    fn mark(&mut self, key: &str, period: Duration) -> VmResult<()> {
        log::debug!("duplicate mark: {key} for {period:?}");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct DemoHost;

impl DemoHost {
    pub fn new() -> Self {
        Self
    }
}

impl Host for DemoHost {
    type Message = DemoMessage;
    type Smtp = DemoSmtp;
    type Duplicate = DemoDuplicate;

    fn open_script(&self, _location: ScriptLocation, name: &str) -> VmResult<Option<String>> {
        log::warn!("include {name:?} requested but this demo host has no script store");
        Ok(None)
    }

    fn open_smtp(&self) -> VmResult<Box<Self::Smtp>> {
        Ok(Box::new(DemoSmtp))
    }

    fn open_duplicate_transaction(&self) -> VmResult<Self::Duplicate> {
        Ok(DemoDuplicate)
    }

    fn log(&self, level: log::Level, message: &str) {
        log::log!(level, "{message}");
    }
}
