pub mod layers;
pub mod recurrent;
