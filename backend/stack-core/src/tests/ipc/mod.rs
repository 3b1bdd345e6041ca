mod deserializer;
mod event;
mod request;
mod response;
