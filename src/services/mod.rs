pub mod excel;
pub mod export;
pub mod generator;
pub mod risk;
pub mod stories;
pub mod table;
