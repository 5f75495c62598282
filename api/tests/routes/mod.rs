mod feedback;
mod health_test;
