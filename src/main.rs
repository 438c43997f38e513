fn main() {
    println!("mixoploid-rs - Trio B-allele frequency and mixoploidy tools");
    println!();
    println!("RECOMMENDED: estimate the diploid/triploid mixture of a proband:");
    println!("  trio_mixoploid - VCF + proband/father/mother -> per-chromosome diploid fraction (TSV)");
    println!();
    println!("Inspection tools:");
    println!("  trio_ballele   - Proband depths per parental genotype class (TSV)");
    println!("  ballele        - Per-variant B-allele frequencies of one sample (TSV)");
    println!();
    println!("For help with each tool:");
    println!("  cargo run --bin trio_mixoploid -- --help");
    println!("  cargo run --bin trio_ballele -- --help");
    println!("  cargo run --bin ballele -- --help");
    println!();
    println!("Quick start example:");
    println!("  cargo run --bin trio_mixoploid -- trio.vcf.gz KID DAD MOM -d 20 -q 20 > ratios.tsv");
    println!();
    println!("A tabix index (trio.vcf.gz.tbi) enables per-chromosome random access;");
    println!("without one the VCF is scanned sequentially.");
}
