pub mod coinche;
