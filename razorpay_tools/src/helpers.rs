use rand::{distributions::Alphanumeric, Rng};

/// Generates a fresh receipt id for a new gateway order. Receipts only need to be unique per merchant account, so a
/// random alphanumeric tail is plenty.
pub fn new_receipt_id() -> String {
    let tail = rand::thread_rng().sample_iter(&Alphanumeric).take(12).map(char::from).collect::<String>();
    format!("keepsake_{tail}")
}
