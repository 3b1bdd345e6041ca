mod helpers;
mod receiver;
mod stack;
