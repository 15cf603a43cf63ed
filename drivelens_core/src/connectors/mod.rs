pub mod google_drive;
