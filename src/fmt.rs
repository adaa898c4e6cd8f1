use crate::models::Amount;
use crate::money::{fraction_digits, Money};

/// Format an amount with thousands separators and its currency code: `-1,234.56 USD`.
/// Values that do not parse are shown as stored.
pub fn amount(amount: &Amount) -> String {
    let Ok(money) = Money::parse(&amount.value, &amount.currency) else {
        return format!("{} {}", amount.value, amount.currency.to_uppercase());
    };
    let digits = fraction_digits(money.currency()) as usize;
    let value = money.value();
    let negative = value.is_sign_negative() && !value.is_zero();
    let fixed = format!("{:.*}", digits, value.abs());
    let (int_part, dec_part) = match fixed.split_once('.') {
        Some((i, d)) => (i.to_string(), Some(d.to_string())),
        None => (fixed.clone(), None),
    };

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    let sign = if negative { "-" } else { "" };
    match dec_part {
        Some(d) => format!("{sign}{with_commas}.{d} {}", money.currency()),
        None => format!("{sign}{with_commas} {}", money.currency()),
    }
}
