use bigdecimal::BigDecimal;
use common_money::{format_amount, NormalizedMoney};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
struct AmountPayload {
    amount: BigDecimal,
}

#[test]
fn json_amount_formats_for_gateway() {
    let de: AmountPayload = serde_json::from_str(r#"{"amount":"5.678"}"#).unwrap();
    assert_eq!(format_amount(&de.amount), "5.68");
    assert_eq!(NormalizedMoney::new(de.amount).to_string(), "5.68");
}
