mod balance_tests;
mod order_queue_tests;
