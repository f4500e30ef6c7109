use super::labels::Labels;
use crate::domain::address::Address;
use crate::domain::job::Job;
use crate::domain::provider::Provider;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct JobRow<'a> {
    index: u64,
    owner: String,
    provider: String,
    metadata: &'a str,
    rate: u64,
    balance: u64,
    last_settled: i64,
}

#[derive(Debug, Serialize)]
struct ProviderRow<'a> {
    authority: String,
    cp: &'a str,
}

#[derive(Debug, Serialize)]
struct BalanceRow {
    account: String,
    balance: u64,
}

/// Writes end-of-run market state as CSV, naming addresses by their labels.
pub struct ReportWriter<'l, W: Write> {
    writer: csv::Writer<W>,
    labels: &'l Labels,
}

impl<'l, W: Write> ReportWriter<'l, W> {
    pub fn new(sink: W, labels: &'l Labels) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
            labels,
        }
    }

    pub fn write_jobs(&mut self, jobs: &[Job]) -> Result<()> {
        if jobs.is_empty() {
            self.writer.write_record([
                "index",
                "owner",
                "provider",
                "metadata",
                "rate",
                "balance",
                "last_settled",
            ])?;
        }
        for job in jobs {
            self.writer.serialize(JobRow {
                index: job.index,
                owner: self.labels.name(&job.owner),
                provider: self.labels.name(&job.provider),
                metadata: &job.metadata,
                rate: job.rate,
                balance: job.balance,
                last_settled: job.last_settled,
            })?;
        }
        self.flush()
    }

    pub fn write_providers(&mut self, providers: &[Provider]) -> Result<()> {
        if providers.is_empty() {
            self.writer.write_record(["authority", "cp"])?;
        }
        for provider in providers {
            self.writer.serialize(ProviderRow {
                authority: self.labels.name(&provider.authority),
                cp: &provider.cp,
            })?;
        }
        self.flush()
    }

    pub fn write_balances(&mut self, balances: &[(Address, u64)]) -> Result<()> {
        if balances.is_empty() {
            self.writer.write_record(["account", "balance"])?;
        }
        for (account, balance) in balances {
            self.writer.serialize(BalanceRow {
                account: self.labels.name(account),
                balance: *balance,
            })?;
        }
        self.flush()
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(write: impl FnOnce(&mut ReportWriter<'_, &mut Vec<u8>>) -> Result<()>) -> String {
        let mut labels = Labels::new();
        labels.resolve("alice");
        labels.resolve("bob");
        let mut out = Vec::new();
        {
            let mut writer = ReportWriter::new(&mut out, &labels);
            write(&mut writer).unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_write_jobs() {
        let job = Job {
            index: 0,
            owner: Address::from_label("alice"),
            provider: Address::from_label("bob"),
            metadata: "gpu".to_string(),
            rate: 5,
            balance: 95,
            last_settled: 1_000,
        };
        let out = render(|writer| writer.write_jobs(&[job]));
        assert_eq!(
            out,
            "index,owner,provider,metadata,rate,balance,last_settled\n0,alice,bob,gpu,5,95,1000\n"
        );
    }

    #[test]
    fn test_write_providers_and_balances() {
        let provider = Provider::new(Address::from_label("bob"), "http://bob".to_string()).unwrap();
        let out = render(|writer| writer.write_providers(&[provider]));
        assert_eq!(out, "authority,cp\nbob,http://bob\n");

        let out = render(|writer| writer.write_balances(&[(Address::from_label("alice"), 7)]));
        assert_eq!(out, "account,balance\nalice,7\n");
    }

    #[test]
    fn test_empty_report_keeps_header() {
        let out = render(|writer| writer.write_jobs(&[]));
        assert_eq!(
            out,
            "index,owner,provider,metadata,rate,balance,last_settled\n"
        );
    }
}
