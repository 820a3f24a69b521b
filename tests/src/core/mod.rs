mod printer;
mod scope;
