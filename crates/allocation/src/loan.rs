use std::sync::OnceLock;

use regex::Regex;
use rentbook_core::{try_parse_finnish_number, Money};
use serde::{Deserialize, Serialize};

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// Digits are ASCII only; the keywords may end a compound word ("Lainakorko").
re!(re_principal, r"(?i)lyhennys\s+([0-9\s]+,[0-9]{2})\s+euroa");
re!(re_interest, r"(?i)korko\s+([0-9\s]+,[0-9]{2})\s+euroa");
re!(re_handling_fee, r"(?i)kulut\s+([0-9\s]+,[0-9]{2})\s+euroa");
re!(re_remaining, r"(?i)jäljellä\s+([0-9\s]+,[0-9]{2})\s+euroa");

/// Amounts stated in a bank's loan-payment message, e.g.
/// `Lyhennys 244,25 euroa Korko 166,37 euroa Kulut 2,50 euroa Jäljellä 65 851,63 euroa`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanPaymentComponents {
    pub principal: Money,
    pub interest: Money,
    pub handling_fee: Money,
    /// Outstanding loan balance after this payment.
    pub remaining: Money,
}

impl LoanPaymentComponents {
    /// Principal + interest + handling fee, i.e. what left the account.
    /// `None` if the stated amounts are too large to add up.
    pub fn total_payment(&self) -> Option<Money> {
        self.principal
            .checked_add(self.interest)?
            .checked_add(self.handling_fee)
    }
}

/// Extracts loan components from a payment message.
///
/// Each field is located independently, so order and surrounding text do not
/// matter. Principal, interest and remaining balance are required; a message
/// missing any of them yields `None`. A missing handling fee reads as zero.
pub fn parse_loan_payment_message(message: &str) -> Option<LoanPaymentComponents> {
    if message.trim().is_empty() {
        return None;
    }

    let principal = capture_amount(re_principal(), message)?;
    let interest = capture_amount(re_interest(), message)?;
    let remaining = capture_amount(re_remaining(), message)?;
    let handling_fee = capture_amount(re_handling_fee(), message).unwrap_or_else(Money::zero);

    Some(LoanPaymentComponents {
        principal,
        interest,
        handling_fee,
        remaining,
    })
}

pub fn is_loan_payment_message(message: &str) -> bool {
    parse_loan_payment_message(message).is_some()
}

fn capture_amount(re: &Regex, text: &str) -> Option<Money> {
    let caps = re.captures(text)?;
    let number = try_parse_finnish_number(caps.get(1)?.as_str())?;
    Some(Money::from_decimal(number))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eur(cents: i64) -> Money {
        Money::from_cents(cents)
    }

    #[test]
    fn full_message_with_handling_fee() {
        let msg = "Lyhennys 244,25 euroa Korko 166,37 euroa Kulut 2,50 euroa OP-bonuksista Jäljellä 65 851,63 euroa";
        let parsed = parse_loan_payment_message(msg).unwrap();
        assert_eq!(
            parsed,
            LoanPaymentComponents {
                principal: eur(24425),
                interest: eur(16637),
                handling_fee: eur(250),
                remaining: eur(6585163),
            }
        );
        assert_eq!(parsed.total_payment(), Some(eur(41312)));
    }

    #[test]
    fn handling_fee_defaults_to_zero() {
        let msg = "Lyhennys 500,00 euroa Korko 100,00 euroa Jäljellä 50 000,00 euroa";
        let parsed = parse_loan_payment_message(msg).unwrap();
        assert_eq!(parsed.principal, eur(50000));
        assert_eq!(parsed.interest, eur(10000));
        assert!(parsed.handling_fee.is_zero());
        assert_eq!(parsed.remaining, eur(5000000));
    }

    #[test]
    fn missing_principal_is_none() {
        assert_eq!(
            parse_loan_payment_message("Korko 50,00 euroa Jäljellä 1000,00 euroa"),
            None
        );
    }

    #[test]
    fn missing_interest_or_remaining_is_none() {
        assert!(parse_loan_payment_message("Lyhennys 1,00 euroa Jäljellä 9,00 euroa").is_none());
        assert!(parse_loan_payment_message("Lyhennys 1,00 euroa Korko 2,00 euroa").is_none());
    }

    #[test]
    fn case_insensitive_including_umlauts() {
        let msg = "LYHENNYS 10,00 EUROA korko 1,00 Euroa JÄLJELLÄ 90,00 EUROA";
        let parsed = parse_loan_payment_message(msg).unwrap();
        assert_eq!(parsed.principal, eur(1000));
        assert_eq!(parsed.remaining, eur(9000));
    }

    #[test]
    fn field_order_does_not_matter() {
        let msg = "Viite 123 Jäljellä 1 000,00 euroa, Kulut 1,50 euroa; Korko 4,00 euroa / Lyhennys 95,00 euroa";
        let parsed = parse_loan_payment_message(msg).unwrap();
        assert_eq!(parsed.principal, eur(9500));
        assert_eq!(parsed.interest, eur(400));
        assert_eq!(parsed.handling_fee, eur(150));
        assert_eq!(parsed.remaining, eur(100000));
    }

    #[test]
    fn number_without_cents_is_not_recognised() {
        assert!(parse_loan_payment_message("Lyhennys 244 euroa Korko 1,00 euroa Jäljellä 5,00 euroa").is_none());
    }

    #[test]
    fn keywords_inside_compound_words_match() {
        let parsed = parse_loan_payment_message(
            "Lyhennys 10,00 euroa Lainakorko 1,00 euroa Pankkikulut 0,50 euroa Jäljellä 5,00 euroa",
        )
        .unwrap();
        assert_eq!(parsed.principal, eur(1000));
        assert_eq!(parsed.interest, eur(100));
        assert_eq!(parsed.handling_fee, eur(50));
        assert_eq!(parsed.remaining, eur(500));
    }

    #[test]
    fn non_ascii_digits_are_not_amounts() {
        let msg = "Lyhennys \u{661}\u{660},\u{660}\u{660} euroa Korko 1,00 euroa Jäljellä 5,00 euroa";
        assert!(parse_loan_payment_message(msg).is_none());
        assert!(!is_loan_payment_message(msg));
    }

    #[test]
    fn oversized_amounts_parse_but_do_not_total() {
        let msg = "Lyhennys 50000000000000000000000000000,00 euroa Korko 50000000000000000000000000000,00 euroa Jäljellä 1,00 euroa";
        let parsed = parse_loan_payment_message(msg).unwrap();
        assert_eq!(parsed.total_payment(), None);
    }

    #[test]
    fn empty_input_is_none() {
        assert!(parse_loan_payment_message("").is_none());
        assert!(parse_loan_payment_message("   ").is_none());
    }

    #[test]
    fn detector_agrees_with_parser() {
        let samples = [
            "Lyhennys 500,00 euroa Korko 100,00 euroa Jäljellä 50 000,00 euroa",
            "Korko 50,00 euroa Jäljellä 1000,00 euroa",
            "Vuokra tammikuu",
            "",
        ];
        for msg in samples {
            assert_eq!(
                is_loan_payment_message(msg),
                parse_loan_payment_message(msg).is_some(),
                "disagreement on {msg:?}"
            );
        }
    }
}
