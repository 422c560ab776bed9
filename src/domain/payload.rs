//! Fulfillment payload generator.
//!
//! Records are synthesized on demand from the operating system's CSPRNG;
//! two calls with the same inputs never produce the same payload.

use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use std::fmt;

const ADJECTIVES: &[&str] = &[
    "Sharp", "Prime", "Apex", "Nova", "Swift", "Urban", "Cloud", "Bright", "Stellar", "Vivid",
    "Elite", "Rapid", "Luxe", "Core", "Matrix", "Vector", "Nimbus", "Vertex", "Fusion", "Pulse",
];

const NOUNS: &[&str] = &[
    "Pro", "Shop", "Mart", "Hub", "Store", "Market", "Plaza", "Point", "Depot", "Trade", "Lane",
    "Cart", "Outlet", "Supply", "Retail", "Bazaar", "Shelf", "Corner", "Space", "Zone",
];

pub const CREDENTIAL_LEN: usize = 12;

/// One delivered account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub variant: String,
    /// `<Adjective>_<Noun>_<9 digits>`
    pub handle: String,
    pub credential: String,
    pub order_count: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulfillmentPayload {
    pub records: Vec<AccountRecord>,
}

impl FulfillmentPayload {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl fmt::Display for AccountRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Geo: {}\nShop: {}\nPassword: {}\nStatus: Active ({} orders)",
            self.variant, self.handle, self.credential, self.order_count
        )
    }
}

impl fmt::Display for FulfillmentPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, record) in self.records.iter().enumerate() {
            if i > 0 {
                f.write_str("\n\n")?;
            }
            write!(f, "{record}")?;
        }
        Ok(())
    }
}

/// Generates `quantity` independent records for `variant`.
pub fn generate(variant: &str, quantity: u32) -> FulfillmentPayload {
    let mut rng = OsRng;
    let records = (0..quantity)
        .map(|_| {
            let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("Prime");
            let noun = NOUNS.choose(&mut rng).copied().unwrap_or("Shop");
            let serial: u32 = rng.gen_range(100_000_000..1_000_000_000);
            let credential: String = (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(CREDENTIAL_LEN)
                .map(char::from)
                .collect();
            AccountRecord {
                variant: variant.to_string(),
                handle: format!("{adjective}_{noun}_{serial}"),
                credential,
                order_count: rng.gen_range(1..=25),
            }
        })
        .collect();
    FulfillmentPayload { records }
}
