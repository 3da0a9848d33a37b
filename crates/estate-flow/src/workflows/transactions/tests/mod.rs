mod common;
mod letters;
mod sales;
