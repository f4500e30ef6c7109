use std::fs::File;
use std::io::Error;
use std::path::Path;

pub const HEADER: [&str; 8] = ["op", "at", "signer", "provider", "job", "rate", "amount", "text"];

/// Rate of every generated job: one token per second.
pub const RATE: u64 = 1_000_000_000_000;

/// Writes a script that opens `jobs` jobs, one second apart, each escrowing
/// 10 tokens with a single provider, then settles every one of them once
/// late enough for the whole escrow to have accrued.
pub fn generate_script(path: &Path, jobs: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(HEADER)?;
    wtr.write_record(["initialize", "0", "admin", "", "", "", "60", "RATE_LOCK"])?;
    wtr.write_record(["airdrop", "0", "alice", "", "", "", &(jobs * 10).to_string(), ""])?;
    wtr.write_record(["provider_add", "0", "bob", "", "", "", "", "http://bob"])?;

    let rate = RATE.to_string();
    for i in 0..jobs {
        wtr.write_record([
            "job_open",
            &i.to_string(),
            "alice",
            "bob",
            "",
            &rate,
            "10",
            "",
        ])?;
    }

    let end = (jobs + 10).to_string();
    for i in 0..jobs {
        wtr.write_record(["job_settle", &end, "keeper", "bob", &i.to_string(), "", "", ""])?;
    }

    wtr.flush()?;
    Ok(())
}
