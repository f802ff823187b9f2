//! Accrual Index Tracker
//!
//! Interest is never applied per holder. Each reserve carries two running
//! indices and every balance is stored divided by the index in force when it
//! was written. Bringing a reserve up to date is therefore O(1):
//!
//! ```text
//! liquidityIndex *= 1 + supplyRatePerSecond * elapsed
//! borrowIndex    *= 1 + borrowRatePerSecond * elapsed
//! ```
//!
//! Rates are taken from the utilization *before* the update. The share of
//! borrower interest not credited to suppliers (the reserve factor) is minted
//! to the treasury as scaled supply.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::rate::{utilization, InterestRateModel, RateParams};
use crate::reserve::ReserveState;

/// What a single accrual step did to a reserve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accrual {
    /// Seconds covered by this step
    pub elapsed: u64,
    pub utilization: Decimal,
    /// Annual borrow rate applied
    pub borrow_rate: Decimal,
    /// Annual supply rate applied
    pub supply_rate: Decimal,
    pub liquidity_index: Decimal,
    pub borrow_index: Decimal,
    /// Scaled supply minted to the treasury
    pub treasury_minted: Decimal,
}

impl ReserveState {
    /// Bring the indices up to `now`.
    ///
    /// Returns `None` when no time has passed, including when `now` is
    /// behind the last update.
    pub fn accrue(&mut self, params: &RateParams, now: u64) -> Option<Accrual> {
        if now <= self.last_update {
            return None;
        }

        let elapsed = now - self.last_update;
        let seconds = Decimal::from(elapsed);

        let u = utilization(self.raw_total_supplied(), self.raw_total_borrowed());
        let borrow_per_second = params.borrow_rate_per_second(u);
        let supply_per_second = params.supply_rate_per_second(u);

        let liquidity_index = self.liquidity_index * (Decimal::ONE + supply_per_second * seconds);
        let borrow_index = self.borrow_index * (Decimal::ONE + borrow_per_second * seconds);

        let borrower_interest = self.scaled_borrowed * (borrow_index - self.borrow_index);
        let supplier_interest = self.scaled_supplied * (liquidity_index - self.liquidity_index);
        let treasury_minted =
            ((borrower_interest - supplier_interest) / liquidity_index).max(Decimal::ZERO);

        self.liquidity_index = liquidity_index;
        self.borrow_index = borrow_index;
        self.scaled_supplied += treasury_minted;
        self.scaled_treasury += treasury_minted;
        self.last_update = now;

        Some(Accrual {
            elapsed,
            utilization: u,
            borrow_rate: params.borrow_rate(u),
            supply_rate: params.supply_rate(u),
            liquidity_index,
            borrow_index,
            treasury_minted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate::SECONDS_PER_YEAR;
    use rust_decimal_macros::dec;

    fn tolerance() -> Decimal {
        dec!(0.000000001)
    }

    #[test]
    fn test_no_time_elapsed_is_noop() {
        let mut state = ReserveState::new(1_000);
        let before = state.clone();

        assert!(state.accrue(&RateParams::default(), 1_000).is_none());
        assert!(state.accrue(&RateParams::default(), 500).is_none());
        assert_eq!(state, before);
    }

    #[test]
    fn test_linear_borrow_accrual_one_year() {
        let mut state = ReserveState::new(0);
        state.add_scaled_supply(dec!(1000));
        state.add_scaled_borrow(dec!(500));

        let accrual = state
            .accrue(&RateParams::flat(dec!(0.05)), SECONDS_PER_YEAR)
            .unwrap();

        assert_eq!(accrual.elapsed, SECONDS_PER_YEAR);
        assert_eq!(accrual.utilization, dec!(0.5));
        assert!((state.borrow_index() - dec!(1.05)).abs() < tolerance());
        // supply rate = 0.05 * 0.5 with no reserve factor
        assert!((state.liquidity_index() - dec!(1.025)).abs() < tolerance());
        assert_eq!(state.last_update(), SECONDS_PER_YEAR);
    }

    #[test]
    fn test_accrual_is_linear_not_compounded() {
        let params = RateParams::flat(dec!(0.10));

        let mut once = ReserveState::new(0);
        once.accrue(&params, 2 * SECONDS_PER_YEAR);

        // Two one-year steps compound the index; one two-year step does not
        let mut twice = ReserveState::new(0);
        twice.accrue(&params, SECONDS_PER_YEAR);
        twice.accrue(&params, 2 * SECONDS_PER_YEAR);

        assert!((once.borrow_index() - dec!(1.2)).abs() < tolerance());
        assert!((twice.borrow_index() - dec!(1.21)).abs() < tolerance());
    }

    #[test]
    fn test_empty_reserve_supply_index_unchanged() {
        let mut state = ReserveState::new(0);
        state.accrue(&RateParams::default(), SECONDS_PER_YEAR);
        assert_eq!(state.liquidity_index(), Decimal::ONE);
        assert_eq!(state.scaled_supplied(), Decimal::ZERO);
    }

    #[test]
    fn test_reserve_factor_minted_to_treasury() {
        let params = RateParams::flat(dec!(0.10)).with_reserve_factor(dec!(0.2));
        let mut state = ReserveState::new(0);
        state.add_scaled_supply(dec!(1000));
        state.add_scaled_borrow(dec!(800));

        let accrual = state.accrue(&params, SECONDS_PER_YEAR).unwrap();
        assert!(accrual.treasury_minted > Decimal::ZERO);

        // Borrowers owe 80, suppliers earn 64, treasury takes 16
        let supplied = state.raw_total_supplied();
        let borrowed = state.raw_total_borrowed();
        assert!((borrowed - dec!(880)).abs() < tolerance());
        assert!((supplied - dec!(1080)).abs() < tolerance());
        let treasury = state.scaled_treasury * state.liquidity_index();
        assert!((treasury - dec!(16)).abs() < tolerance());
    }

    #[test]
    fn test_full_utilization_keeps_borrowed_below_supplied() {
        let params = RateParams::default();
        let mut state = ReserveState::new(0);
        state.add_scaled_supply(dec!(1000));
        state.add_scaled_borrow(dec!(1000));

        let mut now = 0;
        for _ in 0..10 {
            now += SECONDS_PER_YEAR;
            state.accrue(&params, now);
            let borrowed = state.raw_total_borrowed().round_dp(6);
            let supplied = state.raw_total_supplied().round_dp(6);
            assert!(borrowed <= supplied, "{borrowed} > {supplied}");
        }
    }

    #[test]
    fn test_indices_non_decreasing() {
        let params = RateParams::default();
        let mut state = ReserveState::new(0);
        state.add_scaled_supply(dec!(100));
        state.add_scaled_borrow(dec!(60));

        let mut previous = (state.liquidity_index(), state.borrow_index());
        for step in 1..=50u64 {
            state.accrue(&params, step * 86_400);
            let current = (state.liquidity_index(), state.borrow_index());
            assert!(current.0 >= previous.0);
            assert!(current.1 >= previous.1);
            previous = current;
        }
    }
}
