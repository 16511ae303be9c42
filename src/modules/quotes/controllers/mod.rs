pub mod quote_controller;
