pub mod heavy;
