// src/services/settlement.rs

use crate::models::{
    CommissionPolicy, DailyRecord, Expense, ExpenseCategory, FinancialSummary,
    FixedExpenseBreakdown, MarginHealth, UnifiedExpenses,
};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use thiserror::Error;

/// A period is considered healthy when the real net margin clears this
/// percentage. Business constant, not configurable.
pub const HEALTHY_MARGIN_PCT: Decimal = dec!(15);

/// Spanish general IVA rate applied on the variable-expense input path.
pub const IVA_RATE: Decimal = dec!(0.21);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettlementError {
    #[error("'{field}' cannot be negative")]
    NegativeAmount { field: &'static str },

    #[error("'{field}' must be between 0 and 1, got {value}")]
    RateOutOfRange { field: &'static str, value: Decimal },

    #[error("end_km {end_km} is below start_km {start_km}")]
    OdometerReversed { start_km: i32, end_km: i32 },
}

/// Commission and net take-home derived from one shift's figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySettlement {
    pub driver_commission: Decimal,
    pub net_amount: Decimal,
}

/// Round to cents. Applied where a value is persisted or presented; interim
/// arithmetic keeps full precision.
fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub struct SettlementService;

impl SettlementService {
    pub fn ensure_non_negative(
        field: &'static str,
        value: Decimal,
    ) -> Result<Decimal, SettlementError> {
        if value < Decimal::ZERO {
            return Err(SettlementError::NegativeAmount { field });
        }
        Ok(value)
    }

    /// Validate odometer readings and return the kilometers driven.
    pub fn validate_odometer(start_km: i32, end_km: i32) -> Result<i32, SettlementError> {
        if start_km < 0 {
            return Err(SettlementError::NegativeAmount { field: "start_km" });
        }
        if end_km < start_km {
            return Err(SettlementError::OdometerReversed { start_km, end_km });
        }
        Ok(end_km - start_km)
    }

    /// Derive one day's driver commission and net amount under the given
    /// policy. Both outputs are rounded to cents.
    pub fn compute_daily_commission(
        total_amount: Decimal,
        fuel_expense: Decimal,
        other_expenses: Decimal,
        rate: Decimal,
        policy: CommissionPolicy,
    ) -> Result<DailySettlement, SettlementError> {
        Self::ensure_non_negative("total_amount", total_amount)?;
        Self::ensure_non_negative("fuel_expense", fuel_expense)?;
        Self::ensure_non_negative("other_expenses", other_expenses)?;
        if rate < Decimal::ZERO || rate > Decimal::ONE {
            return Err(SettlementError::RateOutOfRange {
                field: "commission_rate",
                value: rate,
            });
        }

        // A zero-income shift settles flat.
        if total_amount.is_zero() {
            return Ok(DailySettlement {
                driver_commission: Decimal::ZERO,
                net_amount: Decimal::ZERO,
            });
        }

        let operational = fuel_expense + other_expenses;
        let driver_commission = round2(match policy {
            CommissionPolicy::GrossRate => total_amount * rate,
            CommissionPolicy::PostExpenseRate => (total_amount - operational) * rate,
        });
        let net_amount = round2(total_amount - operational - driver_commission);

        Ok(DailySettlement {
            driver_commission,
            net_amount,
        })
    }

    /// Split a period's total commission into the payslip portion (capped at
    /// the base salary) and the cash remainder. Informational only; the
    /// commission itself and the net profit are untouched by this split.
    pub fn reconcile_commission(
        driver_commission: Decimal,
        base_salary: Decimal,
    ) -> (Decimal, Decimal) {
        let nomina_real = driver_commission.min(base_salary);
        let efectivo_adicional = (driver_commission - base_salary).max(Decimal::ZERO);
        (nomina_real, efectivo_adicional)
    }

    /// Derive the pre-tax base and IVA portion from a VAT-inclusive total.
    pub fn split_total_with_vat(total: Decimal) -> Result<(Decimal, Decimal), SettlementError> {
        Self::ensure_non_negative("total_amount", total)?;
        let amount = round2(total / (Decimal::ONE + IVA_RATE));
        let tax_amount = total - amount;
        Ok((amount, tax_amount))
    }

    /// Payroll bottom line: base plus earnings, minus deductions and withholding.
    pub fn payroll_net(
        base_salary: Decimal,
        commissions: Decimal,
        bonuses: Decimal,
        deductions: Decimal,
        tax_withholding: Decimal,
    ) -> Decimal {
        base_salary + commissions + bonuses - deductions - tax_withholding
    }

    /// Aggregate a period's records and expenses into a financial summary.
    ///
    /// Per-record commission is summed as stored, not recomputed, so periods
    /// spanning rate or policy changes stay faithful to what each day settled
    /// at. Commission is excluded from `total_expenses` and subtracted exactly
    /// once in the net-profit formula.
    pub fn aggregate_period(
        records: &[DailyRecord],
        expenses: &[Expense],
        base_salary: Decimal,
    ) -> FinancialSummary {
        let total_income: Decimal = records.iter().map(|r| r.total_amount).sum();
        let driver_commission: Decimal = records.iter().map(|r| r.driver_commission).sum();
        let daily_operational_expenses: Decimal = records
            .iter()
            .map(|r| r.fuel_expense + r.other_expenses)
            .sum();

        let mut fixed = FixedExpenseBreakdown::default();
        for expense in expenses.iter().filter(|e| e.is_recurring) {
            let bucket = match expense.category {
                ExpenseCategory::SeguridadSocial => &mut fixed.seguridad_social,
                ExpenseCategory::CuotaAutonomos => &mut fixed.cuota_autonomos,
                ExpenseCategory::CuotaAsociacion => &mut fixed.cuota_asociacion,
                ExpenseCategory::Gestoria => &mut fixed.gestoria,
                ExpenseCategory::Seguro => &mut fixed.seguro,
                ExpenseCategory::Suministros => &mut fixed.suministros,
                // Recurring rows filed under a variable category still count.
                _ => &mut fixed.otros,
            };
            *bucket += expense.amount;
        }

        let variable_expenses: Decimal = expenses
            .iter()
            .filter(|e| !e.is_recurring)
            .map(|e| e.amount)
            .sum();

        let total_expenses = daily_operational_expenses + fixed.total() + variable_expenses;
        let real_net_profit = total_income - driver_commission - total_expenses;
        let (nomina_real, efectivo_adicional) =
            Self::reconcile_commission(driver_commission, base_salary);

        FinancialSummary {
            total_income,
            driver_commission,
            nomina_real,
            efectivo_adicional,
            unified_expenses: UnifiedExpenses {
                monthly_fixed_expenses: fixed,
                daily_operational_expenses,
                variable_expenses,
                total_expenses,
            },
            real_net_profit,
        }
    }

    /// Net margin as a percentage of income, and whether it clears the
    /// health threshold. Zero income yields a 0% margin, not an error.
    pub fn classify_margin(total_income: Decimal, real_net_profit: Decimal) -> MarginHealth {
        let profit_margin_pct = if total_income.is_zero() {
            Decimal::ZERO
        } else {
            real_net_profit / total_income * dec!(100)
        };
        MarginHealth {
            is_healthy: profit_margin_pct > HEALTHY_MARGIN_PCT,
            profit_margin_pct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExpenseFrequency, ExpenseStatus};
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn shift_record(
        total: Decimal,
        fuel: Decimal,
        other: Decimal,
        commission: Decimal,
    ) -> DailyRecord {
        DailyRecord {
            id: Uuid::new_v4(),
            driver_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            start_km: 100,
            end_km: 250,
            total_km: 150,
            cash_amount: total,
            card_amount: Decimal::ZERO,
            invoice_amount: Decimal::ZERO,
            other_amount: Decimal::ZERO,
            total_amount: total,
            fuel_expense: fuel,
            other_expenses: other,
            commission_policy: CommissionPolicy::GrossRate,
            commission_rate: dec!(0.35),
            driver_commission: commission,
            net_amount: total - commission - fuel - other,
            notes: None,
            shift_start: None,
            shift_end: None,
            shift_break: None,
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn expense(category: ExpenseCategory, amount: Decimal, recurring: bool) -> Expense {
        Expense {
            id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            category,
            description: "test line".to_string(),
            amount,
            tax_amount: Decimal::ZERO,
            total_amount: amount,
            is_recurring: recurring,
            frequency: recurring.then_some(ExpenseFrequency::Monthly),
            next_due_date: recurring.then(|| NaiveDate::from_ymd_opt(2024, 4, 5).unwrap()),
            status: ExpenseStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn gross_rate_commission_before_expenses() {
        let s = SettlementService::compute_daily_commission(
            dec!(200),
            dec!(20),
            dec!(5),
            dec!(0.35),
            CommissionPolicy::GrossRate,
        )
        .unwrap();
        assert_eq!(s.driver_commission, dec!(70));
        assert_eq!(s.net_amount, dec!(105));
    }

    #[test]
    fn post_expense_rate_commission_after_expenses() {
        let s = SettlementService::compute_daily_commission(
            dec!(200),
            dec!(20),
            dec!(5),
            dec!(0.35),
            CommissionPolicy::PostExpenseRate,
        )
        .unwrap();
        assert_eq!(s.driver_commission, dec!(61.25));
        assert_eq!(s.net_amount, dec!(113.75));
    }

    #[test]
    fn zero_income_shift_settles_flat() {
        let s = SettlementService::compute_daily_commission(
            Decimal::ZERO,
            dec!(30),
            Decimal::ZERO,
            dec!(0.35),
            CommissionPolicy::GrossRate,
        )
        .unwrap();
        assert_eq!(s.driver_commission, Decimal::ZERO);
        assert_eq!(s.net_amount, Decimal::ZERO);
    }

    #[test]
    fn negative_inputs_name_the_offending_field() {
        let err = SettlementService::compute_daily_commission(
            dec!(100),
            dec!(-1),
            Decimal::ZERO,
            dec!(0.35),
            CommissionPolicy::GrossRate,
        )
        .unwrap_err();
        assert_eq!(
            err,
            SettlementError::NegativeAmount {
                field: "fuel_expense"
            }
        );

        let err = SettlementService::compute_daily_commission(
            dec!(100),
            Decimal::ZERO,
            Decimal::ZERO,
            dec!(1.5),
            CommissionPolicy::GrossRate,
        )
        .unwrap_err();
        assert!(matches!(err, SettlementError::RateOutOfRange { .. }));
    }

    #[test]
    fn odometer_validation() {
        assert_eq!(SettlementService::validate_odometer(100, 150), Ok(50));
        assert_eq!(
            SettlementService::validate_odometer(150, 100),
            Err(SettlementError::OdometerReversed {
                start_km: 150,
                end_km: 100
            })
        );
        assert_eq!(
            SettlementService::validate_odometer(-1, 100),
            Err(SettlementError::NegativeAmount { field: "start_km" })
        );
    }

    #[test]
    fn empty_period_aggregates_to_zero() {
        let summary = SettlementService::aggregate_period(&[], &[], dec!(1400));
        assert_eq!(summary.total_income, Decimal::ZERO);
        assert_eq!(summary.driver_commission, Decimal::ZERO);
        assert_eq!(summary.unified_expenses.total_expenses, Decimal::ZERO);
        assert_eq!(summary.real_net_profit, Decimal::ZERO);
        assert_eq!(summary.nomina_real, Decimal::ZERO);
        assert_eq!(summary.efectivo_adicional, Decimal::ZERO);
    }

    #[test]
    fn five_identical_shifts_aggregate() {
        let records: Vec<DailyRecord> = (0..5)
            .map(|_| {
                let s = SettlementService::compute_daily_commission(
                    dec!(200),
                    dec!(20),
                    dec!(5),
                    dec!(0.35),
                    CommissionPolicy::GrossRate,
                )
                .unwrap();
                assert_eq!(s.driver_commission, dec!(70));
                assert_eq!(s.net_amount, dec!(105));
                shift_record(dec!(200), dec!(20), dec!(5), s.driver_commission)
            })
            .collect();

        let summary = SettlementService::aggregate_period(&records, &[], dec!(1400));
        assert_eq!(summary.total_income, dec!(1000));
        assert_eq!(summary.driver_commission, dec!(350));
        assert_eq!(summary.unified_expenses.daily_operational_expenses, dec!(125));
        assert_eq!(summary.unified_expenses.total_expenses, dec!(125));
        assert_eq!(summary.real_net_profit, dec!(525));
        assert_eq!(summary.nomina_real, dec!(350));
        assert_eq!(summary.efectivo_adicional, Decimal::ZERO);
    }

    #[test]
    fn aggregation_is_additive_except_the_salary_split() {
        let a = shift_record(dec!(2000), dec!(100), Decimal::ZERO, dec!(800));
        let b = shift_record(dec!(2200), dec!(120), dec!(30), dec!(800));
        let base = dec!(1400);

        let agg_a = SettlementService::aggregate_period(std::slice::from_ref(&a), &[], base);
        let agg_b = SettlementService::aggregate_period(std::slice::from_ref(&b), &[], base);
        let combined = SettlementService::aggregate_period(&[a, b], &[], base);

        assert_eq!(combined.total_income, agg_a.total_income + agg_b.total_income);
        assert_eq!(
            combined.driver_commission,
            agg_a.driver_commission + agg_b.driver_commission
        );
        assert_eq!(
            combined.unified_expenses.total_expenses,
            agg_a.unified_expenses.total_expenses + agg_b.unified_expenses.total_expenses
        );
        assert_eq!(
            combined.real_net_profit,
            agg_a.real_net_profit + agg_b.real_net_profit
        );

        // The salary split is reconciled against the combined commission, not
        // summed per aggregation: each half stays under the base on its own.
        assert_eq!(agg_a.nomina_real + agg_b.nomina_real, dec!(1600));
        assert_eq!(combined.nomina_real, dec!(1400));
        assert_eq!(combined.efectivo_adicional, dec!(200));
        let (nomina, efectivo) =
            SettlementService::reconcile_commission(combined.driver_commission, base);
        assert_eq!((combined.nomina_real, combined.efectivo_adicional), (nomina, efectivo));
    }

    #[test]
    fn fixed_expenses_bucket_by_category_with_zero_defaults() {
        let expenses = vec![
            expense(ExpenseCategory::SeguridadSocial, dec!(300), true),
            expense(ExpenseCategory::Gestoria, dec!(60), true),
            // A recurring row filed under a variable category lands in otros.
            expense(ExpenseCategory::Combustible, dec!(50), true),
            expense(ExpenseCategory::Mantenimiento, dec!(40), false),
        ];

        let summary = SettlementService::aggregate_period(&[], &expenses, dec!(1400));
        let fixed = &summary.unified_expenses.monthly_fixed_expenses;
        assert_eq!(fixed.seguridad_social, dec!(300));
        assert_eq!(fixed.gestoria, dec!(60));
        assert_eq!(fixed.otros, dec!(50));
        assert_eq!(fixed.cuota_autonomos, Decimal::ZERO);
        assert_eq!(fixed.cuota_asociacion, Decimal::ZERO);
        assert_eq!(fixed.seguro, Decimal::ZERO);
        assert_eq!(fixed.suministros, Decimal::ZERO);
        assert_eq!(summary.unified_expenses.variable_expenses, dec!(40));
        assert_eq!(summary.unified_expenses.total_expenses, dec!(450));
        assert_eq!(summary.real_net_profit, dec!(-450));
    }

    #[test]
    fn commission_salary_reconciliation() {
        assert_eq!(
            SettlementService::reconcile_commission(dec!(1600), dec!(1400)),
            (dec!(1400), dec!(200))
        );
        assert_eq!(
            SettlementService::reconcile_commission(dec!(1000), dec!(1400)),
            (dec!(1000), dec!(0))
        );
    }

    #[test]
    fn margin_classification() {
        let m = SettlementService::classify_margin(dec!(1000), dec!(200));
        assert_eq!(m.profit_margin_pct, dec!(20));
        assert!(m.is_healthy);

        let m = SettlementService::classify_margin(dec!(1000), dec!(100));
        assert_eq!(m.profit_margin_pct, dec!(10));
        assert!(!m.is_healthy);

        let m = SettlementService::classify_margin(Decimal::ZERO, Decimal::ZERO);
        assert_eq!(m.profit_margin_pct, Decimal::ZERO);
        assert!(!m.is_healthy);
    }

    #[test]
    fn vat_split_from_inclusive_total() {
        assert_eq!(
            SettlementService::split_total_with_vat(dec!(121)).unwrap(),
            (dec!(100), dec!(21))
        );
        assert_eq!(
            SettlementService::split_total_with_vat(dec!(100)).unwrap(),
            (dec!(82.64), dec!(17.36))
        );
        assert_eq!(
            SettlementService::split_total_with_vat(dec!(-5)).unwrap_err(),
            SettlementError::NegativeAmount {
                field: "total_amount"
            }
        );
    }

    #[test]
    fn summary_round_trips_through_json_to_the_cent() {
        let records = vec![shift_record(dec!(201.55), dec!(19.99), dec!(5.01), dec!(70.54))];
        let expenses = vec![expense(ExpenseCategory::Seguro, dec!(82.64), true)];
        let summary = SettlementService::aggregate_period(&records, &expenses, dec!(1400));

        let json = serde_json::to_string(&summary).unwrap();
        let back: FinancialSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, summary);
        assert_eq!(back.unified_expenses.monthly_fixed_expenses.seguro, dec!(82.64));
    }
}
