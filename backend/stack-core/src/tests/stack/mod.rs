mod mock_stack;
mod state;
