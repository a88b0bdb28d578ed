pub mod ad_submission;
