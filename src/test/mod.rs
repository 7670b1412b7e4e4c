mod reconstruct;
