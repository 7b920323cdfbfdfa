//! Price Feed Interface
//!
//! Chainlink-style aggregator interface the farm reads token prices from,
//! plus `MockV3Aggregator`, a settable feed deployed on local networks.

use odra::casper_types::U256;
use odra::prelude::*;

/// Answer of a price feed round
#[odra::odra_type]
pub struct RoundData {
    pub round_id: u64,
    /// Price scaled by `10^decimals`
    pub answer: U256,
    pub started_at: u64,
    pub updated_at: u64,
    pub answered_in_round: u64,
}

/// Price Feed External Contract Interface
#[odra::external_contract]
pub trait PriceFeed {
    /// Latest round reported by the feed
    fn latest_round_data(&self) -> RoundData;

    /// Number of decimals `answer` is scaled by
    fn decimals(&self) -> u8;

    fn description(&self) -> String;

    fn version(&self) -> u64;
}

/// Mock feed parameters used on local networks
pub mod mock {
    /// Decimals of every mock feed
    pub const DECIMALS: u8 = 18;

    /// Initial mock answer: 2 USD, 18 decimals
    pub const INITIAL_PRICE_FEED_VALUE: u128 = 2_000_000_000_000_000_000;
}

const MOCK_VERSION: u64 = 4;

pub mod events {
    use odra::casper_types::U256;
    use odra::prelude::*;

    #[odra::event]
    pub struct AnswerUpdated {
        pub current: U256,
        pub round_id: u64,
        pub updated_at: u64,
    }
}

/// MockV3Aggregator: price feed whose answer is set by anyone
#[odra::module(events = [events::AnswerUpdated])]
pub struct MockV3Aggregator {
    decimals: Var<u8>,
    latest_round: Var<u64>,
    latest_answer: Var<U256>,
    latest_timestamp: Var<u64>,
    started_at: Mapping<u64, u64>,
}

#[odra::module]
impl MockV3Aggregator {
    pub fn init(&mut self, decimals: u8, initial_answer: U256) {
        self.decimals.set(decimals);
        self.latest_round.set(0);
        self.update_answer(initial_answer);
    }

    /// Start a new round with `answer`
    pub fn update_answer(&mut self, answer: U256) {
        let now = self.env().get_block_time();
        let round_id = self.latest_round.get_or_default() + 1;

        self.latest_answer.set(answer);
        self.latest_timestamp.set(now);
        self.latest_round.set(round_id);
        self.started_at.set(&round_id, now);

        self.env().emit_event(events::AnswerUpdated {
            current: answer,
            round_id,
            updated_at: now,
        });
    }

    pub fn latest_round_data(&self) -> RoundData {
        let round_id = self.latest_round.get_or_default();
        RoundData {
            round_id,
            answer: self.latest_answer.get_or_default(),
            started_at: self.started_at.get(&round_id).unwrap_or_default(),
            updated_at: self.latest_timestamp.get_or_default(),
            answered_in_round: round_id,
        }
    }

    pub fn latest_answer(&self) -> U256 {
        self.latest_answer.get_or_default()
    }

    pub fn latest_round(&self) -> u64 {
        self.latest_round.get_or_default()
    }

    pub fn decimals(&self) -> u8 {
        self.decimals.get_or_default()
    }

    pub fn description(&self) -> String {
        "v0.8/tests/MockV3Aggregator".to_string()
    }

    pub fn version(&self) -> u64 {
        MOCK_VERSION
    }
}
