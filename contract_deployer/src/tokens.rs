use ethers::abi::Token;
use serde_json::Value;

/// JSON shape of a decoded ABI value, as it goes into deployment records.
///
/// Integers become decimal strings since they rarely fit in a JSON number.
pub fn token_to_json(token: &Token) -> Value {
    match token {
        Token::Address(address) => Value::String(format!("{address:?}")),
        Token::Uint(n) => Value::String(n.to_string()),
        Token::Int(n) => Value::String(ethers::types::I256::from_raw(*n).to_string()),
        Token::Bool(b) => Value::Bool(*b),
        Token::String(s) => Value::String(s.clone()),
        Token::Bytes(bytes) | Token::FixedBytes(bytes) => {
            Value::String(format!("0x{}", hex::encode(bytes)))
        }
        Token::Array(items) | Token::FixedArray(items) | Token::Tuple(items) => {
            Value::Array(items.iter().map(token_to_json).collect())
        }
    }
}

/// Function outputs: a lone value is unwrapped, several become an array.
pub fn outputs_to_json(tokens: &[Token]) -> Value {
    match tokens {
        [single] => token_to_json(single),
        many => Value::Array(many.iter().map(token_to_json).collect()),
    }
}
