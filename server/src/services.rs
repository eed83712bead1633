pub mod buildservice;
