use super::labels::Labels;
use crate::application::instruction::Instruction;
use crate::domain::address::Address;
use crate::domain::market::RATE_LOCK_SELECTOR;
use crate::domain::signer::Signer;
use crate::error::{MarketError, Result};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    Initialize,
    ProviderAdd,
    ProviderUpdate,
    ProviderRemove,
    JobOpen,
    JobSettle,
    JobClose,
    JobWithdraw,
    Airdrop,
}

/// One line of an instruction script.
///
/// Columns are shared across operations; each operation reads the ones it
/// needs and ignores the rest. `initialize` takes the market admin from the
/// `provider` column, defaulting to the signer.
#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
pub struct InstructionRow {
    pub op: Op,
    pub at: i64,
    pub signer: String,
    pub provider: Option<String>,
    pub job: Option<u64>,
    pub rate: Option<u64>,
    pub amount: Option<u64>,
    pub text: Option<String>,
}

/// What a script line asks for once its labels are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// Funds an account on the simulated token service.
    Airdrop { account: Address, amount: u64 },
    Execute {
        signer: Signer,
        instruction: Instruction,
    },
}

impl InstructionRow {
    pub fn resolve(self, labels: &mut Labels) -> Result<ScriptStep> {
        let signer = labels.resolve(&self.signer);
        let instruction = match self.op {
            Op::Airdrop => {
                return Ok(ScriptStep::Airdrop {
                    account: signer,
                    amount: require(self.amount, "amount")?,
                });
            }
            Op::Initialize => Instruction::Initialize {
                selector: self
                    .text
                    .unwrap_or_else(|| RATE_LOCK_SELECTOR.to_string()),
                wait_time: require(self.amount, "amount")?,
                admin: provider_or_signer(self.provider.as_deref(), signer, labels),
            },
            Op::ProviderAdd => Instruction::ProviderAdd {
                cp: self.text.unwrap_or_default(),
            },
            Op::ProviderUpdate => Instruction::ProviderUpdateWithCp {
                provider: provider_or_signer(self.provider.as_deref(), signer, labels),
                cp: self.text.unwrap_or_default(),
            },
            Op::ProviderRemove => Instruction::ProviderRemove {
                provider: provider_or_signer(self.provider.as_deref(), signer, labels),
            },
            Op::JobOpen => Instruction::JobOpen {
                metadata: self.text.unwrap_or_default(),
                provider: labels.resolve(&require(self.provider, "provider")?),
                rate: require(self.rate, "rate")?,
                balance: require(self.amount, "amount")?,
            },
            Op::JobSettle => Instruction::JobSettle {
                index: require(self.job, "job")?,
                provider: labels.resolve(&require(self.provider, "provider")?),
            },
            Op::JobClose => Instruction::JobClose {
                index: require(self.job, "job")?,
                provider: labels.resolve(&require(self.provider, "provider")?),
            },
            Op::JobWithdraw => Instruction::JobWithdraw {
                index: require(self.job, "job")?,
                provider: labels.resolve(&require(self.provider, "provider")?),
                amount: require(self.amount, "amount")?,
            },
        };
        Ok(ScriptStep::Execute {
            signer: Signer::new(signer),
            instruction,
        })
    }
}

fn require<T>(value: Option<T>, column: &str) -> Result<T> {
    value.ok_or_else(|| MarketError::InvalidInstruction(format!("missing {column}")))
}

fn provider_or_signer(provider: Option<&str>, signer: Address, labels: &mut Labels) -> Address {
    provider.map_or(signer, |label| labels.resolve(label))
}

/// Reads instruction rows from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<InstructionRow>`.
/// It handles whitespace trimming and flexible record lengths automatically.
pub struct InstructionReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> InstructionReader<R> {
    /// Creates a new `InstructionReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes rows.
    pub fn rows(self) -> impl Iterator<Item = Result<InstructionRow>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(MarketError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "op, at, signer, provider, job, rate, amount, text\n";

    fn rows(body: &str) -> Vec<Result<InstructionRow>> {
        InstructionReader::new(format!("{HEADER}{body}").as_bytes())
            .rows()
            .collect()
    }

    #[test]
    fn test_reader_valid_stream() {
        let results = rows(
            "initialize, 0, admin, , , , 60, RATE_LOCK\n\
             job_open, 10, alice, bob, , 5000000000000, 100, {}\n",
        );
        assert_eq!(results.len(), 2);

        let open = results[1].as_ref().unwrap();
        assert_eq!(open.op, Op::JobOpen);
        assert_eq!(open.at, 10);
        assert_eq!(open.provider.as_deref(), Some("bob"));
        assert_eq!(open.rate, Some(5_000_000_000_000));
        assert_eq!(open.amount, Some(100));
        assert_eq!(open.job, None);
    }

    #[test]
    fn test_reader_malformed_line() {
        let results = rows("explode, 0, admin, , , , , \n");
        assert!(results[0].is_err());
    }

    #[test]
    fn test_resolve_job_open() {
        let mut labels = Labels::new();
        let row = rows("job_open, 10, alice, bob, , 7, 100, gpu\n")
            .remove(0)
            .unwrap();

        let step = row.resolve(&mut labels).unwrap();
        assert_eq!(
            step,
            ScriptStep::Execute {
                signer: Signer::new(Address::from_label("alice")),
                instruction: Instruction::JobOpen {
                    metadata: "gpu".to_string(),
                    provider: Address::from_label("bob"),
                    rate: 7,
                    balance: 100,
                },
            }
        );
        assert_eq!(labels.name(&Address::from_label("bob")), "bob");
    }

    #[test]
    fn test_resolve_defaults() {
        let mut labels = Labels::new();
        let row = rows("initialize, 0, admin, , , , 60, \n").remove(0).unwrap();
        let step = row.resolve(&mut labels).unwrap();
        assert!(matches!(
            step,
            ScriptStep::Execute {
                instruction: Instruction::Initialize { ref selector, wait_time: 60, admin },
                ..
            } if selector == "RATE_LOCK" && admin == Address::from_label("admin")
        ));

        let row = rows("provider_remove, 0, bob, , , , , \n").remove(0).unwrap();
        let step = row.resolve(&mut labels).unwrap();
        assert!(matches!(
            step,
            ScriptStep::Execute {
                instruction: Instruction::ProviderRemove { provider },
                ..
            } if provider == Address::from_label("bob")
        ));
    }

    #[test]
    fn test_resolve_initialize_with_separate_admin() {
        let mut labels = Labels::new();
        let row = rows("initialize, 0, payer, ops, , , 60, RATE_LOCK\n")
            .remove(0)
            .unwrap();
        let step = row.resolve(&mut labels).unwrap();
        assert_eq!(
            step,
            ScriptStep::Execute {
                signer: Signer::new(Address::from_label("payer")),
                instruction: Instruction::Initialize {
                    selector: "RATE_LOCK".to_string(),
                    wait_time: 60,
                    admin: Address::from_label("ops"),
                },
            }
        );
    }

    #[test]
    fn test_resolve_missing_column() {
        let mut labels = Labels::new();
        let row = rows("job_settle, 0, keeper, bob, , , , \n").remove(0).unwrap();
        assert!(matches!(
            row.resolve(&mut labels),
            Err(MarketError::InvalidInstruction(_))
        ));
    }
}
