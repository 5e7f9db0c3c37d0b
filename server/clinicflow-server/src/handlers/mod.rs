pub mod charge_orders;
pub mod encounters;
pub mod health;
pub mod waiting_room;
